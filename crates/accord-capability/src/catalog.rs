//! Capability catalog - which capability needs which trust tier.
//!
//! The catalog is immutable at runtime: it is configuration, not state.

use accord_types::{RiskLevel, TrustTier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A capability an agent may request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub risk_level: RiskLevel,
    pub required_trust_tier: TrustTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolDefinition>,
}

/// Optional tool surface attached to a capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Structured gate outcome. Callers branch on `allowed`, never on errors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilityDecision {
    pub allowed: bool,
    pub reason: String,
}

impl CapabilityDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Immutable registry of capabilities keyed by id.
pub struct CapabilityCatalog {
    capabilities: HashMap<String, Capability>,
}

impl CapabilityCatalog {
    /// Build a catalog from an explicit capability set.
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self {
            capabilities: capabilities
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    /// Catalog seeded with the default governance capability set.
    pub fn with_defaults() -> Self {
        let entry = |id: &str, risk: RiskLevel, tier: TrustTier| Capability {
            id: id.to_string(),
            risk_level: risk,
            required_trust_tier: tier,
            tool: None,
        };

        Self::new(vec![
            entry("read_data", RiskLevel::Low, TrustTier::Untrusted),
            entry("query_knowledge", RiskLevel::Low, TrustTier::Untrusted),
            entry("generate_report", RiskLevel::Low, TrustTier::Provisional),
            entry("send_message", RiskLevel::Medium, TrustTier::Provisional),
            entry("write_data", RiskLevel::Medium, TrustTier::Established),
            entry("call_external_api", RiskLevel::Medium, TrustTier::Established),
            entry("schedule_task", RiskLevel::Medium, TrustTier::Established),
            entry("file_operations", RiskLevel::High, TrustTier::Trusted),
            entry("execute_transaction", RiskLevel::High, TrustTier::Verified),
            entry("modify_config", RiskLevel::High, TrustTier::Verified),
            entry("manage_agents", RiskLevel::Critical, TrustTier::Certified),
            entry("deploy_code", RiskLevel::Critical, TrustTier::Certified),
            entry("financial_transfer", RiskLevel::Critical, TrustTier::Certified),
            entry("modify_permissions", RiskLevel::Critical, TrustTier::Certified),
        ])
    }

    /// Lookup a capability by id.
    pub fn get(&self, capability_id: &str) -> Option<&Capability> {
        self.capabilities.get(capability_id)
    }

    /// Gate a capability against the caller's current tier.
    ///
    /// An unknown capability id is a hard deny, never a default-allow.
    pub fn check(&self, capability_id: &str, tier: TrustTier) -> CapabilityDecision {
        let Some(capability) = self.capabilities.get(capability_id) else {
            debug!(capability_id, "capability check: unknown id");
            return CapabilityDecision::deny(format!(
                "unknown capability id '{capability_id}'"
            ));
        };

        if tier >= capability.required_trust_tier {
            CapabilityDecision::allow(format!(
                "tier {tier} meets requirement {}",
                capability.required_trust_tier
            ))
        } else {
            CapabilityDecision::deny(format!(
                "capability '{capability_id}' requires tier {} but agent is {tier}",
                capability.required_trust_tier
            ))
        }
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
