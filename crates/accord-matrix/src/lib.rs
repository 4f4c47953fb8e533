//! Accord Matrix - combines trust and risk into an execution path
//!
//! The router is a fixed decision ladder evaluated top to bottom, first match
//! wins. Its reasoning strings are surfaced to auditors verbatim, so their
//! content and order are part of the contract, not decoration.
//!
//! The yellow path proceeds through a synchronous, stateless policy check;
//! policy violations block, warnings do not.

#![deny(unsafe_code)]

use accord_types::{ActionContext, MatrixPath, NextAction, RiskLevel, TrustTier};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trust score at or above which low/medium risk executes directly.
pub const GREEN_TRUST_THRESHOLD: u32 = 800;

/// Trust score at or above which non-critical risk earns a policy check.
pub const YELLOW_TRUST_THRESHOLD: u32 = 400;

/// Trust score below which user-data actions violate policy.
pub const USER_DATA_TRUST_FLOOR: u32 = 600;

/// Trust score below which irreversible actions require approval.
pub const IRREVERSIBLE_TRUST_FLOOR: u32 = 800;

/// Immutable result of routing one `(trust, risk)` tuple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixResult {
    pub path: MatrixPath,
    pub next_action: NextAction,
    pub can_proceed: bool,
    /// Ordered, human-readable reasoning trail. Order matters for audit
    /// readability.
    pub reasoning: Vec<String>,
}

/// Result of the stateless yellow-path policy check.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub required_approvals: Vec<String>,
}

impl PolicyCheck {
    /// Violations block proceeding; warnings and approvals do not.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The risk x trust routing matrix.
pub struct MatrixRouter;

impl MatrixRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route an action. Decision order is fixed; no exceptions.
    pub fn route(
        &self,
        trust_score: u32,
        risk_level: RiskLevel,
        agent_tier: TrustTier,
        action_type: &str,
    ) -> MatrixResult {
        let mut reasoning = vec![format!(
            "routing '{action_type}' for {agent_tier} agent: trust={trust_score}, risk={risk_level}"
        )];

        // 1. Critical risk overrides trust entirely.
        if risk_level == RiskLevel::Critical {
            reasoning.push("critical risk overrides trust; human review required".to_string());
            return self.finish(MatrixPath::Red, NextAction::HumanReview, false, reasoning);
        }

        // 2. High trust with low/medium risk executes directly.
        if trust_score >= GREEN_TRUST_THRESHOLD
            && matches!(risk_level, RiskLevel::Low | RiskLevel::Medium)
        {
            reasoning.push(format!(
                "trust {trust_score} >= {GREEN_TRUST_THRESHOLD} and risk {risk_level} within green band"
            ));
            reasoning.push("auto-approved for execution".to_string());
            return self.finish(MatrixPath::Green, NextAction::Execute, true, reasoning);
        }

        // 3. Moderate trust with non-critical risk goes through policy
        //    validation before proceeding.
        if trust_score >= YELLOW_TRUST_THRESHOLD && risk_level.numeric() <= 3 {
            reasoning.push(format!(
                "trust {trust_score} >= {YELLOW_TRUST_THRESHOLD} and risk {risk_level} is not critical"
            ));
            reasoning.push("routed to synchronous policy validation".to_string());
            return self.finish(MatrixPath::Yellow, NextAction::PolicyCheck, true, reasoning);
        }

        // 4. Everything else: low trust or unhandled risk.
        reasoning.push(format!(
            "trust {trust_score} below {YELLOW_TRUST_THRESHOLD} or risk {risk_level} unhandled; council vote required"
        ));
        self.finish(MatrixPath::Red, NextAction::CouncilVote, false, reasoning)
    }

    /// Stateless policy rules applied on the yellow path.
    pub fn check_policy(&self, trust_score: u32, context: &ActionContext) -> PolicyCheck {
        let mut check = PolicyCheck::default();

        // Financial context is an automatic violation regardless of the
        // matrix result.
        if context.financial {
            check
                .violations
                .push("financial actions are never auto-approved by policy".to_string());
        }

        if context.user_data {
            if trust_score < USER_DATA_TRUST_FLOOR {
                check.violations.push(format!(
                    "user data access requires trust >= {USER_DATA_TRUST_FLOOR}, agent has {trust_score}"
                ));
            } else {
                check
                    .warnings
                    .push("user data access by trusted agent; monitored".to_string());
            }
        }

        if context.irreversible && trust_score < IRREVERSIBLE_TRUST_FLOOR {
            check.required_approvals.push(format!(
                "irreversible action below trust {IRREVERSIBLE_TRUST_FLOOR} requires explicit approval"
            ));
        }

        if context.public_facing {
            check
                .warnings
                .push("public-facing output subject to review sampling".to_string());
        }

        check
    }

    fn finish(
        &self,
        path: MatrixPath,
        next_action: NextAction,
        can_proceed: bool,
        reasoning: Vec<String>,
    ) -> MatrixResult {
        debug!(?path, ?next_action, can_proceed, "matrix routed");
        MatrixResult {
            path,
            next_action,
            can_proceed,
            reasoning,
        }
    }
}

impl Default for MatrixRouter {
    fn default() -> Self {
        Self::new()
    }
}
