//! Accord Risk - classifies an action into a risk level
//!
//! Risk is a property of the action, not of the actor: the assessor never
//! looks at trust. The base level comes from a static action-type table;
//! contextual flags can only raise it, never lower it. Unknown action types
//! default to medium and are flagged in the assessment factors.

#![deny(unsafe_code)]

use accord_types::{ActionContext, Escalation, RiskLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of assessing one action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Human-readable factors, in the order they were evaluated.
    pub factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<Escalation>,
    pub requires_approval: bool,
}

/// Static action-type classification. Immutable at runtime; acts as
/// configuration, not state.
pub struct RiskAssessor {
    table: Vec<(&'static str, RiskLevel)>,
}

impl RiskAssessor {
    pub fn new() -> Self {
        Self {
            table: vec![
                ("read_data", RiskLevel::Low),
                ("query_knowledge", RiskLevel::Low),
                ("generate_report", RiskLevel::Low),
                ("summarize", RiskLevel::Low),
                ("write_data", RiskLevel::Medium),
                ("send_message", RiskLevel::Medium),
                ("call_external_api", RiskLevel::Medium),
                ("schedule_task", RiskLevel::Medium),
                ("file_operations", RiskLevel::High),
                ("modify_config", RiskLevel::High),
                ("execute_transaction", RiskLevel::High),
                ("manage_agents", RiskLevel::High),
                ("delete_data", RiskLevel::Critical),
                ("financial_transfer", RiskLevel::Critical),
                ("deploy_code", RiskLevel::Critical),
                ("modify_permissions", RiskLevel::Critical),
            ],
        }
    }

    /// Base level for an action type. Unknown types are medium.
    pub fn base_level(&self, action_type: &str) -> RiskLevel {
        self.table
            .iter()
            .find(|(name, _)| *name == action_type)
            .map(|(_, level)| *level)
            .unwrap_or(RiskLevel::Medium)
    }

    /// Assess an action type with its context.
    pub fn assess(&self, action_type: &str, context: &ActionContext) -> RiskAssessment {
        let mut level = self.base_level(action_type);
        let mut factors = Vec::new();

        if self
            .table
            .iter()
            .all(|(name, _)| *name != action_type)
        {
            factors.push(format!(
                "unknown action type '{action_type}' defaulted to medium risk"
            ));
        } else {
            factors.push(format!("action type '{action_type}' classified {level}"));
        }

        // Context flags raise the floor; each one is recorded as a factor.
        if context.financial {
            level = level.max(RiskLevel::High);
            factors.push("financial context raises risk to at least high".to_string());
        }
        if context.irreversible {
            level = level.max(RiskLevel::High);
            factors.push("irreversible effect raises risk to at least high".to_string());
        }
        if context.user_data {
            level = level.max(RiskLevel::Medium);
            factors.push("user data involved".to_string());
        }
        if context.external_api {
            level = level.max(RiskLevel::Medium);
            factors.push("external API call".to_string());
        }
        if context.public_facing {
            level = level.max(RiskLevel::Medium);
            factors.push("public-facing output".to_string());
        }

        let (escalate_to, requires_approval) = match level {
            RiskLevel::Critical => (Some(Escalation::Human), true),
            RiskLevel::High => (Some(Escalation::Council), false),
            _ => (None, false),
        };

        debug!(action_type, level = %level, factors = factors.len(), "risk assessed");

        RiskAssessment {
            level,
            factors,
            escalate_to,
            requires_approval,
        }
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_action_types_use_the_table() {
        let assessor = RiskAssessor::new();
        assert_eq!(assessor.base_level("read_data"), RiskLevel::Low);
        assert_eq!(assessor.base_level("send_message"), RiskLevel::Medium);
        assert_eq!(assessor.base_level("file_operations"), RiskLevel::High);
        assert_eq!(assessor.base_level("financial_transfer"), RiskLevel::Critical);
    }

    #[test]
    fn unknown_action_type_defaults_to_medium() {
        let assessor = RiskAssessor::new();
        let result = assessor.assess("telekinesis", &ActionContext::default());
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(result.factors[0].contains("unknown action type"));
        assert!(result.escalate_to.is_none());
    }

    #[test]
    fn critical_always_escalates_to_human() {
        let assessor = RiskAssessor::new();
        let result = assessor.assess("delete_data", &ActionContext::default());
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(result.escalate_to, Some(Escalation::Human));
        assert!(result.requires_approval);
    }

    #[test]
    fn high_escalates_to_council_without_approval() {
        let assessor = RiskAssessor::new();
        let result = assessor.assess("modify_config", &ActionContext::default());
        assert_eq!(result.level, RiskLevel::High);
        assert_eq!(result.escalate_to, Some(Escalation::Council));
        assert!(!result.requires_approval);
    }

    #[test]
    fn financial_context_raises_low_action_to_high() {
        let assessor = RiskAssessor::new();
        let result = assessor.assess("read_data", &ActionContext::financial());
        assert_eq!(result.level, RiskLevel::High);
        assert!(result
            .factors
            .iter()
            .any(|f| f.contains("financial context")));
    }

    #[test]
    fn context_flags_never_lower_risk() {
        let assessor = RiskAssessor::new();
        let ctx = ActionContext {
            user_data: true,
            ..Default::default()
        };
        let result = assessor.assess("delete_data", &ctx);
        assert_eq!(result.level, RiskLevel::Critical);
    }

    #[test]
    fn factors_are_recorded_in_evaluation_order() {
        let assessor = RiskAssessor::new();
        let ctx = ActionContext {
            financial: true,
            external_api: true,
            ..Default::default()
        };
        let result = assessor.assess("write_data", &ctx);
        assert!(result.factors[0].contains("write_data"));
        assert!(result.factors[1].contains("financial"));
        assert!(result.factors[2].contains("external API"));
    }
}
