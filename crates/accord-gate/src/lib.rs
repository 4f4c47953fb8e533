//! Accord Gate - the staged governance pipeline
//!
//! One entry point, `GovernanceGate::submit`, runs an action request
//! through the full decision path: directory resolution, shadow
//! interception, capability gating, role permission, risk assessment,
//! matrix routing, and the yellow-path policy check. The path is
//! synchronous and in-memory only; it never blocks on I/O.
//!
//! Every submission, allowed or denied, lands on the audit chain. Denials
//! are completed immediately; approved actions leave a pending record that
//! the caller completes with the execution result.

#![deny(unsafe_code)]

pub mod context;
pub mod gate;
pub mod mocks;
pub mod traits;

pub use context::{ActionRequest, GateContext, StageResult};
pub use gate::{GovernanceDecision, GovernanceGate};
pub use traits::{AgentProfile, DirectoryProvider, EscalationEvent, NotificationSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Chain(#[from] accord_chain::ChainError),
}
