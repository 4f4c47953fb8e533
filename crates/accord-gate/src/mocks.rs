//! In-memory collaborators for tests.

use std::collections::HashMap;

use accord_types::AgentId;
use parking_lot::{Mutex, RwLock};

use crate::traits::{AgentProfile, DirectoryProvider, EscalationEvent, NotificationSink};

/// Directory backed by a map.
#[derive(Default)]
pub struct MockDirectory {
    agents: RwLock<HashMap<AgentId, AgentProfile>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: AgentProfile) {
        self.agents.write().insert(profile.agent_id.clone(), profile);
    }
}

impl DirectoryProvider for MockDirectory {
    fn resolve(&self, agent_id: &AgentId) -> Option<AgentProfile> {
        self.agents.read().get(agent_id).cloned()
    }
}

/// Sink that records every escalation it receives.
#[derive(Default)]
pub struct MockNotificationSink {
    events: Mutex<Vec<EscalationEvent>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EscalationEvent> {
        self.events.lock().clone()
    }
}

impl NotificationSink for MockNotificationSink {
    fn notify(&self, event: EscalationEvent) {
        self.events.lock().push(event);
    }
}
