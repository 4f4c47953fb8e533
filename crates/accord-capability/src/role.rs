//! Role gate - RBAC with wildcards and conditional permissions.
//!
//! A permission grants `(action, resource)` with optional conditions. Both
//! sides support the `*` wildcard. Conditions are a closed union evaluated by
//! a match statement; absence of a matching permission is a deny, never an
//! implicit allow.

use accord_types::{AgentId, AgentRole, AgentStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A single role permission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Permission {
    pub action: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PermissionCondition>,
}

impl Permission {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            conditions: vec![],
        }
    }

    pub fn with_condition(mut self, condition: PermissionCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Closed set of permission conditions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PermissionCondition {
    /// The resource owner must equal the caller.
    Owned,
    /// The caller's status must match.
    StatusEquals { status: AgentStatus },
    /// Arbitrary caller-supplied key/value must match.
    Custom { key: String, value: String },
}

/// Evaluation inputs for a permission check.
#[derive(Clone, Debug)]
pub struct PermissionContext {
    pub caller: AgentId,
    pub caller_status: AgentStatus,
    pub resource_owner: Option<String>,
    pub values: HashMap<String, String>,
}

impl PermissionContext {
    pub fn new(caller: AgentId, caller_status: AgentStatus) -> Self {
        Self {
            caller,
            caller_status,
            resource_owner: None,
            values: HashMap::new(),
        }
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.resource_owner = Some(owner.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Structured permission outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: String,
    /// `action:resource` of the permission that granted access, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// Role to permission-set mapping.
pub struct RoleGate {
    permissions: HashMap<AgentRole, Vec<Permission>>,
}

impl RoleGate {
    /// Role gate seeded with the default role hierarchy.
    pub fn with_defaults() -> Self {
        let mut permissions = HashMap::new();

        permissions.insert(
            AgentRole::Observer,
            vec![Permission::new("read", "*")],
        );

        permissions.insert(
            AgentRole::Assistant,
            vec![
                Permission::new("read", "*"),
                Permission::new("send_message", "*"),
                Permission::new("write", "documents")
                    .with_condition(PermissionCondition::Owned),
            ],
        );

        permissions.insert(
            AgentRole::Operator,
            vec![
                Permission::new("read", "*"),
                Permission::new("write", "*"),
                Permission::new("send_message", "*"),
                Permission::new("execute", "tasks"),
                Permission::new("file_operations", "*").with_condition(
                    PermissionCondition::StatusEquals {
                        status: AgentStatus::Active,
                    },
                ),
            ],
        );

        permissions.insert(AgentRole::Administrator, vec![Permission::new("*", "*")]);

        Self { permissions }
    }

    /// Role gate with an explicit mapping (for tests and custom deployments).
    pub fn new(permissions: HashMap<AgentRole, Vec<Permission>>) -> Self {
        Self { permissions }
    }

    /// Check whether `role` may perform `action` on `resource`.
    pub fn check_permission(
        &self,
        role: AgentRole,
        action: &str,
        resource: &str,
        context: &PermissionContext,
    ) -> PermissionDecision {
        let Some(granted) = self.permissions.get(&role) else {
            return PermissionDecision {
                allowed: false,
                reason: format!("role {role:?} has no permission set"),
                matched: None,
            };
        };

        for permission in granted {
            if !pattern_matches(&permission.action, action)
                || !pattern_matches(&permission.resource, resource)
            {
                continue;
            }

            match self.conditions_hold(permission, context) {
                Ok(()) => {
                    return PermissionDecision {
                        allowed: true,
                        reason: format!(
                            "permission {}:{} grants {action} on {resource}",
                            permission.action, permission.resource
                        ),
                        matched: Some(format!(
                            "{}:{}",
                            permission.action, permission.resource
                        )),
                    };
                }
                Err(reason) => {
                    debug!(%reason, action, resource, "permission matched but condition failed");
                    // A failed condition does not end the search; another
                    // permission may still grant the action.
                    continue;
                }
            }
        }

        PermissionDecision {
            allowed: false,
            reason: format!("no permission grants {action} on {resource} for role {role:?}"),
            matched: None,
        }
    }

    fn conditions_hold(
        &self,
        permission: &Permission,
        context: &PermissionContext,
    ) -> Result<(), String> {
        for condition in &permission.conditions {
            match condition {
                PermissionCondition::Owned => {
                    let owner = context.resource_owner.as_deref();
                    if owner != Some(context.caller.0.as_str()) {
                        return Err(format!(
                            "resource owner {:?} is not the caller {}",
                            owner, context.caller
                        ));
                    }
                }
                PermissionCondition::StatusEquals { status } => {
                    if context.caller_status != *status {
                        return Err(format!(
                            "caller status {} does not match required {status}",
                            context.caller_status
                        ));
                    }
                }
                PermissionCondition::Custom { key, value } => {
                    if context.values.get(key) != Some(value) {
                        return Err(format!("context value for '{key}' does not match"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(status: AgentStatus) -> PermissionContext {
        PermissionContext::new(AgentId::new("agent-1"), status)
    }

    #[test]
    fn observer_can_only_read() {
        let gate = RoleGate::with_defaults();
        let context = ctx(AgentStatus::Active);

        assert!(gate
            .check_permission(AgentRole::Observer, "read", "documents", &context)
            .allowed);
        let denied = gate.check_permission(AgentRole::Observer, "write", "documents", &context);
        assert!(!denied.allowed);
        assert!(denied.reason.contains("no permission grants"));
    }

    #[test]
    fn administrator_wildcard_matches_everything() {
        let gate = RoleGate::with_defaults();
        let context = ctx(AgentStatus::Active);
        let result =
            gate.check_permission(AgentRole::Administrator, "modify_permissions", "system", &context);
        assert!(result.allowed);
        assert_eq!(result.matched.as_deref(), Some("*:*"));
    }

    #[test]
    fn owned_condition_requires_matching_owner() {
        let gate = RoleGate::with_defaults();

        let own = ctx(AgentStatus::Active).owned_by("agent-1");
        assert!(gate
            .check_permission(AgentRole::Assistant, "write", "documents", &own)
            .allowed);

        let foreign = ctx(AgentStatus::Active).owned_by("agent-2");
        assert!(!gate
            .check_permission(AgentRole::Assistant, "write", "documents", &foreign)
            .allowed);

        // No owner recorded at all is also a deny.
        let unowned = ctx(AgentStatus::Active);
        assert!(!gate
            .check_permission(AgentRole::Assistant, "write", "documents", &unowned)
            .allowed);
    }

    #[test]
    fn status_condition_gates_file_operations() {
        let gate = RoleGate::with_defaults();

        assert!(gate
            .check_permission(AgentRole::Operator, "file_operations", "workspace", &ctx(AgentStatus::Active))
            .allowed);
        assert!(!gate
            .check_permission(AgentRole::Operator, "file_operations", "workspace", &ctx(AgentStatus::Suspended))
            .allowed);
    }

    #[test]
    fn custom_condition_checks_context_values() {
        let mut permissions = HashMap::new();
        permissions.insert(
            AgentRole::Operator,
            vec![Permission::new("deploy", "staging").with_condition(
                PermissionCondition::Custom {
                    key: "env".to_string(),
                    value: "staging".to_string(),
                },
            )],
        );
        let gate = RoleGate::new(permissions);

        let matching = ctx(AgentStatus::Active).with_value("env", "staging");
        assert!(gate
            .check_permission(AgentRole::Operator, "deploy", "staging", &matching)
            .allowed);

        let wrong = ctx(AgentStatus::Active).with_value("env", "production");
        assert!(!gate
            .check_permission(AgentRole::Operator, "deploy", "staging", &wrong)
            .allowed);
    }
}
