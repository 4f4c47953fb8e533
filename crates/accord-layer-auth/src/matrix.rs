//! Static inter-layer permission matrix.
//!
//! The matrix is configuration, not state: it is compiled in and immutable
//! at runtime. A pair that does not appear here may not communicate at all.

use accord_types::Layer;

/// Capabilities permitted for a `(from, to)` layer pair. `None` means no
/// communication is permitted in that direction.
pub fn pair_capabilities(from: Layer, to: Layer) -> Option<&'static [&'static str]> {
    use Layer::*;
    let capabilities: &'static [&'static str] = match (from, to) {
        (Runtime, Registry) => &["resolve_agent", "report_status"],
        (Runtime, Observer) => &["emit_event", "report_metric"],
        (Runtime, Policy) => &["policy_check"],
        (Registry, Observer) => &["emit_event"],
        (Observer, Policy) => &["report_violation"],
        (Observer, Council) => &["report_anomaly"],
        (Policy, Autonomy) => &["grant_autonomy", "revoke_autonomy"],
        (Policy, Council) => &["request_vote"],
        (Autonomy, Runtime) => &["execute_action"],
        (Autonomy, Council) => &["request_vote"],
        (Council, Policy) => &["publish_ruling"],
        (Council, Human) => &["request_review"],
        (Human, Council) => &["cast_review"],
        (Human, Policy) => &["override_policy"],
        _ => return None,
    };
    Some(capabilities)
}

/// Whether the pair may communicate at all.
pub fn pair_permits(from: Layer, to: Layer) -> bool {
    pair_capabilities(from, to).is_some()
}

/// Every capability a layer may exercise as a caller. Drives identity
/// certificate contents.
pub fn outgoing_capabilities(from: Layer) -> Vec<&'static str> {
    let mut all = Vec::new();
    for to in Layer::ALL {
        if let Some(capabilities) = pair_capabilities(from, to) {
            all.extend_from_slice(capabilities);
        }
    }
    all.sort_unstable();
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_directional() {
        assert!(pair_permits(Layer::Autonomy, Layer::Council));
        assert!(!pair_permits(Layer::Council, Layer::Autonomy));
    }

    #[test]
    fn no_layer_talks_to_itself() {
        for layer in Layer::ALL {
            assert!(!pair_permits(layer, layer));
        }
    }

    #[test]
    fn outgoing_capabilities_are_sorted_and_unique() {
        let caps = outgoing_capabilities(Layer::Runtime);
        assert!(caps.contains(&"emit_event"));
        let mut sorted = caps.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(caps, sorted);
    }
}
