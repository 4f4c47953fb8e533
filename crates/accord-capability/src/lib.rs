//! Accord Capability - static eligibility gating
//!
//! Three gates live here, all evaluated before an action ever reaches the
//! routing matrix:
//!
//! - the capability catalog, mapping capability ids to a minimum trust tier;
//! - the role gate, an RBAC check with wildcard and conditional permissions;
//! - the agent status state machine.
//!
//! Denials are structured results, not errors: a "no" is an expected,
//! first-class outcome. Unknown ids are always a hard deny.

#![deny(unsafe_code)]

pub mod catalog;
pub mod role;
pub mod status;

pub use catalog::{Capability, CapabilityCatalog, CapabilityDecision, ToolDefinition};
pub use role::{
    Permission, PermissionCondition, PermissionContext, PermissionDecision, RoleGate,
};
pub use status::{transition, TransitionAuthority, TransitionError};
