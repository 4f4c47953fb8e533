//! Blast radius containment.
//!
//! Containment is a manual trip-wire for a suspected-compromised layer.
//! It is terminal from this component's point of view: nothing here can
//! un-contain a layer, recovery requires external re-provisioning.

use std::collections::HashSet;

use accord_types::Layer;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentEvent {
    pub layer: Layer,
    pub reason: String,
    pub revoked_sessions: usize,
    pub contained_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct BlastRadiusContainment {
    contained: RwLock<HashSet<Layer>>,
    events: RwLock<Vec<ContainmentEvent>>,
}

impl BlastRadiusContainment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contain(
        &self,
        layer: Layer,
        reason: &str,
        revoked_sessions: usize,
        now: DateTime<Utc>,
    ) -> ContainmentEvent {
        error!(%layer, reason, revoked_sessions, "layer contained");
        self.contained.write().insert(layer);
        let event = ContainmentEvent {
            layer,
            reason: reason.to_string(),
            revoked_sessions,
            contained_at: now,
        };
        self.events.write().push(event.clone());
        event
    }

    pub fn is_contained(&self, layer: Layer) -> bool {
        self.contained.read().contains(&layer)
    }

    pub fn events(&self) -> Vec<ContainmentEvent> {
        self.events.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_recorded_and_sticky() {
        let containment = BlastRadiusContainment::new();
        assert!(!containment.is_contained(Layer::Registry));

        let now: DateTime<Utc> = "2026-02-01T00:00:00Z".parse().unwrap();
        containment.contain(Layer::Registry, "certificate anomaly", 3, now);

        assert!(containment.is_contained(Layer::Registry));
        let events = containment.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].revoked_sessions, 3);
        assert_eq!(events[0].reason, "certificate anomaly");
    }

    #[test]
    fn repeated_containment_appends_events() {
        let containment = BlastRadiusContainment::new();
        let now: DateTime<Utc> = "2026-02-01T00:00:00Z".parse().unwrap();
        containment.contain(Layer::Registry, "first", 0, now);
        containment.contain(Layer::Registry, "second", 0, now);
        assert_eq!(containment.events().len(), 2);
    }
}
