//! Collaborator seams for the gate.
//!
//! The surrounding application supplies these; the gate only consumes
//! them. In-memory implementations for tests live in `mocks`.

use accord_trust::TrustRecord;
use accord_types::{AgentId, AgentRole, AgentStatus, Escalation};
use serde::{Deserialize, Serialize};

/// What the directory knows about one agent.
#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub trust: TrustRecord,
    pub status: AgentStatus,
    pub role: AgentRole,
    pub specialization: String,
}

/// Resolves agent identity and state for gate inputs.
pub trait DirectoryProvider: Send + Sync {
    fn resolve(&self, agent_id: &AgentId) -> Option<AgentProfile>;
}

/// Escalation emitted toward out-of-band council/human workflows. The gate
/// only emits; voting and review happen elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub agent_id: AgentId,
    pub action_type: String,
    pub escalate_to: Escalation,
    pub reasoning: Vec<String>,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: EscalationEvent);
}
