//! Accord Shadow - parallel execution for agents in training
//!
//! Agents in `training` or `examination` status run alongside a certified
//! agent for the same specialization when one exists. Outputs are compared
//! by word-set Jaccard similarity and the comparison history, pruned to a
//! rolling window, gates graduation.
//!
//! Output routing is deliberate about safety: a training agent's output is
//! never user-visible. With a certified comparator the certified output is
//! surfaced instead; without one, nothing is.

#![deny(unsafe_code)]

use std::collections::{HashMap, HashSet};

use accord_types::{AgentId, AgentStatus};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct ShadowConfig {
    /// Rolling comparison window.
    pub window_days: i64,
    /// Minimum executions inside the window.
    pub min_executions: usize,
    /// Minimum mean match score, percent.
    pub min_match_rate: f64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_executions: 100,
            min_match_rate: 95.0,
        }
    }
}

/// One shadow-vs-certified comparison. `match_score` is `None` when no
/// certified comparator existed for the specialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShadowComparison {
    pub id: String,
    pub agent_id: AgentId,
    pub specialization: String,
    pub match_score: Option<u8>,
    pub compared_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraduationReadiness {
    pub ready: bool,
    pub executions: usize,
    /// Mean match score over scored comparisons in the window; 0 when none.
    pub match_rate: f64,
    pub required_executions: usize,
    pub required_match_rate: f64,
}

/// Word-set Jaccard similarity, 0 to 100. Case-insensitive; two empty
/// outputs count as a full match.
pub fn match_score(a: &str, b: &str) -> u8 {
    let words_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let words_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    if words_a.is_empty() && words_b.is_empty() {
        return 100;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    ((intersection * 100) / union) as u8
}

/// Which output, if any, the caller may surface for a shadowed agent.
pub fn route_output(
    status: AgentStatus,
    shadow_output: String,
    certified_output: Option<String>,
) -> Option<String> {
    match status {
        // Examination output goes to the human/council reviewer.
        AgentStatus::Examination => Some(shadow_output),
        // Training output is discarded in favor of the certified agent's,
        // or suppressed entirely when there is no comparator.
        AgentStatus::Training => certified_output,
        // Not a shadowed status; the output stands on its own.
        _ => Some(shadow_output),
    }
}

pub struct ShadowModeManager {
    config: ShadowConfig,
    history: RwLock<HashMap<AgentId, Vec<ShadowComparison>>>,
}

impl ShadowModeManager {
    pub fn new(config: ShadowConfig) -> Self {
        Self {
            config,
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Compare a shadow execution against the certified output (when one
    /// exists) and retain it. History is pruned to the window on every call.
    pub fn record_execution(
        &self,
        agent_id: &AgentId,
        specialization: &str,
        shadow_output: &str,
        certified_output: Option<&str>,
        now: DateTime<Utc>,
    ) -> ShadowComparison {
        let comparison = ShadowComparison {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.clone(),
            specialization: specialization.to_string(),
            match_score: certified_output.map(|c| match_score(shadow_output, c)),
            compared_at: now,
        };
        debug!(
            agent_id = %agent_id,
            specialization,
            match_score = ?comparison.match_score,
            "shadow execution recorded"
        );

        let cutoff = now - Duration::days(self.config.window_days);
        let mut history = self.history.write();
        let entries = history.entry(agent_id.clone()).or_default();
        entries.retain(|c| c.compared_at >= cutoff);
        entries.push(comparison.clone());
        comparison
    }

    /// Graduation readiness as a pure function of the retained history.
    pub fn graduation_readiness(&self, agent_id: &AgentId, now: DateTime<Utc>) -> GraduationReadiness {
        let cutoff = now - Duration::days(self.config.window_days);
        let history = self.history.read();
        let in_window: Vec<&ShadowComparison> = history
            .get(agent_id)
            .map(|entries| entries.iter().filter(|c| c.compared_at >= cutoff).collect())
            .unwrap_or_default();

        let scored: Vec<u8> = in_window.iter().filter_map(|c| c.match_score).collect();
        let match_rate = if scored.is_empty() {
            0.0
        } else {
            scored.iter().map(|&s| s as f64).sum::<f64>() / scored.len() as f64
        };

        let ready = in_window.len() >= self.config.min_executions
            && match_rate >= self.config.min_match_rate;
        if ready {
            info!(agent_id = %agent_id, executions = in_window.len(), match_rate, "agent ready for graduation");
        }
        GraduationReadiness {
            ready,
            executions: in_window.len(),
            match_rate,
            required_executions: self.config.min_executions,
            required_match_rate: self.config.min_match_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn agent() -> AgentId {
        AgentId::new("shadow-agent-1")
    }

    fn t0() -> DateTime<Utc> {
        "2026-02-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn identical_outputs_match_fully() {
        assert_eq!(match_score("transfer approved by council", "transfer approved by council"), 100);
        assert_eq!(match_score("", ""), 100);
    }

    #[test]
    fn disjoint_outputs_score_zero() {
        assert_eq!(match_score("alpha beta", "gamma delta"), 0);
        assert_eq!(match_score("alpha", ""), 0);
    }

    #[test]
    fn comparison_ignores_case_and_ordering() {
        assert_eq!(match_score("Approve THE transfer", "the transfer approve"), 100);
    }

    #[test]
    fn examination_surfaces_the_shadow_output() {
        assert_eq!(
            route_output(AgentStatus::Examination, "shadow".into(), Some("certified".into())),
            Some("shadow".into())
        );
    }

    #[test]
    fn training_surfaces_certified_or_nothing() {
        assert_eq!(
            route_output(AgentStatus::Training, "shadow".into(), Some("certified".into())),
            Some("certified".into())
        );
        assert_eq!(route_output(AgentStatus::Training, "shadow".into(), None), None);
    }

    #[test]
    fn graduation_requires_both_volume_and_quality() {
        let manager = ShadowModeManager::new(ShadowConfig {
            min_executions: 3,
            ..Default::default()
        });
        let agent = agent();

        manager.record_execution(&agent, "support", "a b c", Some("a b c"), t0());
        manager.record_execution(&agent, "support", "a b c", Some("a b c"), t0());
        // Volume not yet met.
        assert!(!manager.graduation_readiness(&agent, t0()).ready);

        manager.record_execution(&agent, "support", "a b c", Some("a b c"), t0());
        let readiness = manager.graduation_readiness(&agent, t0());
        assert!(readiness.ready);
        assert_eq!(readiness.executions, 3);
        assert_eq!(readiness.match_rate, 100.0);
    }

    #[test]
    fn poor_match_rate_blocks_graduation() {
        let manager = ShadowModeManager::new(ShadowConfig {
            min_executions: 2,
            ..Default::default()
        });
        let agent = agent();
        manager.record_execution(&agent, "support", "a b c d", Some("a b c d"), t0());
        manager.record_execution(&agent, "support", "w x y z", Some("a b c d"), t0());
        let readiness = manager.graduation_readiness(&agent, t0());
        assert!(!readiness.ready);
        assert_eq!(readiness.match_rate, 50.0);
    }

    #[test]
    fn executions_without_a_comparator_never_graduate() {
        let manager = ShadowModeManager::new(ShadowConfig {
            min_executions: 2,
            ..Default::default()
        });
        let agent = agent();
        manager.record_execution(&agent, "support", "a", None, t0());
        manager.record_execution(&agent, "support", "a", None, t0());
        let readiness = manager.graduation_readiness(&agent, t0());
        assert_eq!(readiness.executions, 2);
        assert_eq!(readiness.match_rate, 0.0);
        assert!(!readiness.ready);
    }

    #[test]
    fn history_outside_the_window_is_pruned() {
        let manager = ShadowModeManager::new(ShadowConfig {
            min_executions: 2,
            ..Default::default()
        });
        let agent = agent();
        manager.record_execution(&agent, "support", "a", Some("a"), t0());
        manager.record_execution(&agent, "support", "a", Some("a"), t0());
        assert!(manager.graduation_readiness(&agent, t0()).ready);

        // Eight days on, both fall outside the rolling window.
        let later = t0() + Duration::days(8);
        let readiness = manager.graduation_readiness(&agent, later);
        assert_eq!(readiness.executions, 0);
        assert!(!readiness.ready);
    }

    proptest! {
        #[test]
        fn match_score_is_bounded_and_reflexive(a in "[a-z ]{0,60}", b in "[a-z ]{0,60}") {
            let score = match_score(&a, &b);
            prop_assert!(score <= 100);
            prop_assert_eq!(match_score(&a, &a), 100);
            prop_assert_eq!(match_score(&a, &b), match_score(&b, &a));
        }
    }
}
