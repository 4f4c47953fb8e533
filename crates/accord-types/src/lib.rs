//! Accord Types - shared vocabulary for the governance core
//!
//! Every subsystem speaks in these types: trust tiers, risk levels, routing
//! paths, agent statuses, and the seven governance layers. Field and variant
//! names here are compatibility-sensitive for persisted records and
//! independent chain verifiers.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of a governed agent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trust tiers, ordered. The total order is load-bearing: tier gating
/// compares with `>=`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    Untrusted,
    Provisional,
    Established,
    Trusted,
    Verified,
    Certified,
}

impl TrustTier {
    /// All tiers, lowest first.
    pub const ALL: [TrustTier; 6] = [
        TrustTier::Untrusted,
        TrustTier::Provisional,
        TrustTier::Established,
        TrustTier::Trusted,
        TrustTier::Verified,
        TrustTier::Certified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::Untrusted => "untrusted",
            TrustTier::Provisional => "provisional",
            TrustTier::Established => "established",
            TrustTier::Trusted => "trusted",
            TrustTier::Verified => "verified",
            TrustTier::Certified => "certified",
        }
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk classification of an action, independent of the actor's trust.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Numeric weight used by the routing matrix (low=1 .. critical=4).
    pub fn numeric(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing outcome of the trust x risk matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixPath {
    Green,
    Yellow,
    Red,
}

/// What happens next for a routed action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Execute,
    PolicyCheck,
    CouncilVote,
    HumanReview,
}

/// Where an assessment escalates when risk warrants review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escalation {
    Council,
    Human,
}

/// Lifecycle status of a governed agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Draft,
    Training,
    Examination,
    Active,
    Suspended,
    Retired,
}

impl AgentStatus {
    /// Whether the agent is intercepted by shadow mode instead of routing.
    pub fn is_shadowed(&self) -> bool {
        matches!(self, AgentStatus::Training | AgentStatus::Examination)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Draft => "draft",
            AgentStatus::Training => "training",
            AgentStatus::Examination => "examination",
            AgentStatus::Active => "active",
            AgentStatus::Suspended => "suspended",
            AgentStatus::Retired => "retired",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles an agent can hold, mapped to permission sets by the role gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Observer,
    Assistant,
    Operator,
    Administrator,
}

/// The seven architectural governance layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Runtime,
    Registry,
    Observer,
    Policy,
    Autonomy,
    Council,
    Human,
}

impl Layer {
    pub const ALL: [Layer; 7] = [
        Layer::Runtime,
        Layer::Registry,
        Layer::Observer,
        Layer::Policy,
        Layer::Autonomy,
        Layer::Council,
        Layer::Human,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Runtime => "runtime",
            Layer::Registry => "registry",
            Layer::Observer => "observer",
            Layer::Policy => "policy",
            Layer::Autonomy => "autonomy",
            Layer::Council => "council",
            Layer::Human => "human",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contextual flags accompanying an action request.
///
/// The flags feed both risk assessment and the yellow-path policy check.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionContext {
    #[serde(default)]
    pub external_api: bool,
    #[serde(default)]
    pub user_data: bool,
    #[serde(default)]
    pub financial: bool,
    #[serde(default)]
    pub irreversible: bool,
    #[serde(default)]
    pub public_facing: bool,
    /// Owner of the resource the action touches, when ownership matters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Free-form caller-supplied context consumed by custom RBAC conditions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl ActionContext {
    pub fn financial() -> Self {
        Self {
            financial: true,
            ..Default::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_order_is_total() {
        let mut prev = None;
        for tier in TrustTier::ALL {
            if let Some(p) = prev {
                assert!(p < tier);
            }
            prev = Some(tier);
        }
        assert!(TrustTier::Certified > TrustTier::Untrusted);
        assert!(TrustTier::Trusted > TrustTier::Established);
    }

    #[test]
    fn risk_numeric_matches_order() {
        assert_eq!(RiskLevel::Low.numeric(), 1);
        assert_eq!(RiskLevel::Critical.numeric(), 4);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn wire_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&TrustTier::Provisional).unwrap(),
            "\"provisional\""
        );
        assert_eq!(
            serde_json::to_string(&NextAction::HumanReview).unwrap(),
            "\"human_review\""
        );
        assert_eq!(serde_json::to_string(&Layer::Autonomy).unwrap(), "\"autonomy\"");
    }

    #[test]
    fn shadowed_statuses() {
        assert!(AgentStatus::Training.is_shadowed());
        assert!(AgentStatus::Examination.is_shadowed());
        assert!(!AgentStatus::Active.is_shadowed());
    }
}
