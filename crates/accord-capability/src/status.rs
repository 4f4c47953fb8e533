//! Agent status state machine.
//!
//! `draft -> training -> examination -> active -> {suspended, retired}`, with
//! regressions back to training/draft during onboarding. `retired` is
//! terminal. Activation is reserved: even along a valid edge, only a
//! council/admin authority may move an agent into `active`.

use accord_types::AgentStatus;
use thiserror::Error;

/// Who is requesting the transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionAuthority {
    /// Ordinary caller (the agent itself, or a non-privileged service).
    Standard,
    /// Council vote or administrator action.
    Council,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid status transition {from} -> {to}")]
    InvalidEdge { from: AgentStatus, to: AgentStatus },

    #[error("transition into active is reserved for council/admin authority")]
    ActivationReserved,
}

/// Valid successor statuses for `from`.
pub fn allowed_transitions(from: AgentStatus) -> &'static [AgentStatus] {
    match from {
        AgentStatus::Draft => &[AgentStatus::Training],
        AgentStatus::Training => &[AgentStatus::Examination, AgentStatus::Draft],
        AgentStatus::Examination => &[AgentStatus::Active, AgentStatus::Training],
        AgentStatus::Active => &[AgentStatus::Suspended, AgentStatus::Retired],
        AgentStatus::Suspended => &[AgentStatus::Active, AgentStatus::Retired],
        AgentStatus::Retired => &[],
    }
}

/// Validate a status transition.
pub fn transition(
    from: AgentStatus,
    to: AgentStatus,
    authority: TransitionAuthority,
) -> Result<(), TransitionError> {
    if !allowed_transitions(from).contains(&to) {
        return Err(TransitionError::InvalidEdge { from, to });
    }

    if to == AgentStatus::Active && authority != TransitionAuthority::Council {
        return Err(TransitionError::ActivationReserved);
    }

    Ok(())
}
