//! The governance gate itself.

use std::sync::Arc;

use accord_capability::{CapabilityCatalog, PermissionContext, RoleGate};
use accord_chain::{ActionChain, ChainError, DraftActionRecord};
use accord_matrix::{MatrixRouter, PolicyCheck};
use accord_risk::RiskAssessor;
use accord_shadow::{route_output, ShadowComparison, ShadowConfig, ShadowModeManager};
use accord_types::{AgentId, AgentStatus, Escalation, MatrixPath, NextAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::{ActionRequest, GateContext, StageResult};
use crate::traits::{DirectoryProvider, EscalationEvent, NotificationSink};
use crate::GateError;

/// Final answer of the pipeline.
///
/// `record_id` points at the audit record for this submission. When
/// `can_proceed` is true the record is still pending: the caller must
/// complete it with the execution result before this agent's next action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceDecision {
    pub agent_id: AgentId,
    pub action_type: String,
    pub can_proceed: bool,
    pub shadowed: bool,
    pub path: Option<MatrixPath>,
    pub next_action: Option<NextAction>,
    pub reasoning: Vec<String>,
    pub record_id: String,
}

pub struct GovernanceGate {
    directory: Arc<dyn DirectoryProvider>,
    notifications: Arc<dyn NotificationSink>,
    chain: Arc<ActionChain>,
    catalog: CapabilityCatalog,
    roles: RoleGate,
    risk: RiskAssessor,
    router: MatrixRouter,
    shadow: Arc<ShadowModeManager>,
}

impl GovernanceGate {
    pub fn new(
        directory: Arc<dyn DirectoryProvider>,
        notifications: Arc<dyn NotificationSink>,
        chain: Arc<ActionChain>,
    ) -> Self {
        Self {
            directory,
            notifications,
            chain,
            catalog: CapabilityCatalog::with_defaults(),
            roles: RoleGate::with_defaults(),
            risk: RiskAssessor::new(),
            router: MatrixRouter::new(),
            shadow: Arc::new(ShadowModeManager::new(ShadowConfig::default())),
        }
    }

    pub fn with_catalog(mut self, catalog: CapabilityCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_roles(mut self, roles: RoleGate) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_shadow(mut self, shadow: Arc<ShadowModeManager>) -> Self {
        self.shadow = shadow;
        self
    }

    /// Run one request through the full decision path.
    ///
    /// Fails with `ChainError::PendingCompletion` when the agent's previous
    /// approved action has not been completed yet; the gate will not let an
    /// agent act again while its audit trail has an open record.
    pub fn submit(
        &self,
        request: ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<GovernanceDecision, GateError> {
        let mut ctx = GateContext::new(request);

        // Stage 1: directory resolution. Unknown agents are denied, never
        // defaulted.
        let Some(profile) = self.directory.resolve(&ctx.request.agent_id) else {
            warn!(agent_id = %ctx.request.agent_id, "unknown agent");
            ctx.record_stage("directory", StageResult::Deny("agent not in directory".into()));
            return self.deny(ctx, vec!["agent not found in directory".into()], now);
        };
        ctx.record_stage("directory", StageResult::Pass);

        let trust = accord_trust::snapshot(&profile.trust, now);
        let tier = trust.tier;
        let effective_score = trust.decay.effective_score;
        ctx.trust = Some(trust);

        // Stage 2: shadow interception before any routing.
        if profile.status.is_shadowed() {
            let reason = format!("agent status {} runs in shadow mode", profile.status);
            let readiness = self.shadow.graduation_readiness(&ctx.request.agent_id, now);
            let progress = format!(
                "shadow executions {}/{}, match rate {:.1}%",
                readiness.executions, readiness.required_executions, readiness.match_rate
            );
            info!(agent_id = %ctx.request.agent_id, status = %profile.status, "diverted to shadow mode");
            ctx.record_stage("shadow", StageResult::Diverted(reason.clone()));
            ctx.profile = Some(profile);
            return self.finish(ctx, false, true, None, None, vec![reason, progress], now);
        }
        ctx.record_stage("shadow", StageResult::Pass);

        // Stage 3: capability gate against the current tier.
        let capability = self.catalog.check(&ctx.request.action_type, tier);
        if !capability.allowed {
            let reason = capability.reason.clone();
            ctx.record_stage("capability", StageResult::Deny(reason.clone()));
            ctx.capability = Some(capability);
            ctx.profile = Some(profile);
            return self.deny(ctx, vec![reason], now);
        }
        ctx.record_stage("capability", StageResult::Pass);
        ctx.capability = Some(capability);

        // Stage 4: role permission check.
        let mut permission_ctx = PermissionContext::new(ctx.request.agent_id.clone(), profile.status);
        if let Some(owner) = &ctx.request.context.owner {
            permission_ctx = permission_ctx.owned_by(owner.clone());
        }
        for (key, value) in &ctx.request.context.extra {
            permission_ctx = permission_ctx.with_value(key.clone(), value.clone());
        }
        let permission = self.roles.check_permission(
            profile.role,
            &ctx.request.action_type,
            &ctx.request.resource,
            &permission_ctx,
        );
        if !permission.allowed {
            let reason = permission.reason.clone();
            ctx.record_stage("role", StageResult::Deny(reason.clone()));
            ctx.permission = Some(permission);
            ctx.profile = Some(profile);
            return self.deny(ctx, vec![reason], now);
        }
        ctx.record_stage("role", StageResult::Pass);
        ctx.permission = Some(permission);

        // Stage 5: risk assessment, independent of trust.
        let risk = self.risk.assess(&ctx.request.action_type, &ctx.request.context);
        ctx.record_stage("risk", StageResult::Pass);

        // Stage 6: matrix routing.
        let matrix = self.router.route(
            effective_score,
            risk.level,
            tier,
            &ctx.request.action_type,
        );
        ctx.record_stage("matrix", StageResult::Pass);

        let mut reasoning = matrix.reasoning.clone();
        reasoning.extend(risk.factors.iter().cloned());

        // Yellow path runs the synchronous policy check.
        let mut can_proceed = matrix.can_proceed;
        let mut policy: Option<PolicyCheck> = None;
        if matrix.path == MatrixPath::Yellow {
            let check = self.router.check_policy(effective_score, &ctx.request.context);
            if check.passed() {
                ctx.record_stage("policy", StageResult::Pass);
                reasoning.extend(check.warnings.iter().cloned());
                reasoning.extend(check.required_approvals.iter().cloned());
            } else {
                can_proceed = false;
                reasoning.extend(check.violations.iter().cloned());
                ctx.record_stage(
                    "policy",
                    StageResult::Deny(check.violations.join("; ")),
                );
            }
            policy = Some(check);
        }

        // Escalations go out-of-band; the gate only emits the event.
        let escalation = risk.escalate_to.or(match (can_proceed, matrix.next_action) {
            (false, NextAction::CouncilVote) => Some(Escalation::Council),
            (false, NextAction::HumanReview) => Some(Escalation::Human),
            _ => None,
        });
        if let Some(escalate_to) = escalation {
            self.notifications.notify(EscalationEvent {
                agent_id: ctx.request.agent_id.clone(),
                action_type: ctx.request.action_type.clone(),
                escalate_to,
                reasoning: reasoning.clone(),
            });
        }

        ctx.risk = Some(risk);
        ctx.policy = policy;
        ctx.profile = Some(profile);
        let path = ctx.matrix.insert(matrix).path;
        let next_action = ctx.matrix.as_ref().map(|m| m.next_action);
        self.finish(ctx, can_proceed, false, Some(path), next_action, reasoning, now)
    }

    /// Complete a pending approved action with its execution result.
    pub fn complete(&self, record_id: &str, result: Value) -> Result<(), GateError> {
        self.chain.complete_action(record_id, result)?;
        Ok(())
    }

    /// Record a shadowed execution and return the output, if any, that may
    /// be surfaced to the caller in the shadow agent's place.
    pub fn record_shadow_execution(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
        specialization: &str,
        shadow_output: String,
        certified_output: Option<String>,
        now: DateTime<Utc>,
    ) -> (ShadowComparison, Option<String>) {
        let comparison = self.shadow.record_execution(
            agent_id,
            specialization,
            &shadow_output,
            certified_output.as_deref(),
            now,
        );
        let surfaced = route_output(status, shadow_output, certified_output);
        (comparison, surfaced)
    }

    pub fn shadow(&self) -> &ShadowModeManager {
        &self.shadow
    }

    fn deny(
        &self,
        ctx: GateContext,
        reasoning: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<GovernanceDecision, GateError> {
        self.finish(ctx, false, false, None, None, reasoning, now)
    }

    /// Append the audit record and assemble the decision. Denials and
    /// shadow diversions complete the record immediately; approvals leave
    /// it pending for the caller.
    fn finish(
        &self,
        ctx: GateContext,
        can_proceed: bool,
        shadowed: bool,
        path: Option<MatrixPath>,
        next_action: Option<NextAction>,
        mut reasoning: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<GovernanceDecision, GateError> {
        reasoning.extend(ctx.stage_summary());

        let context_value = serde_json::to_value(&ctx.request.context)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        let record = self.chain.create_action_record(
            DraftActionRecord::new(
                ctx.request.agent_id.0.clone(),
                ctx.request.action_type.clone(),
                ctx.request.parameters.clone(),
                context_value,
            ),
            now,
        )?;

        let decision = GovernanceDecision {
            agent_id: ctx.request.agent_id.clone(),
            action_type: ctx.request.action_type.clone(),
            can_proceed,
            shadowed,
            path,
            next_action,
            reasoning,
            record_id: record.id.clone(),
        };

        if !can_proceed {
            let outcome = serde_json::to_value(&decision)
                .map_err(|e| ChainError::Serialization(e.to_string()))?;
            self.chain.complete_action(&record.id, outcome)?;
        }

        debug!(
            agent_id = %decision.agent_id,
            action_type = %decision.action_type,
            can_proceed = decision.can_proceed,
            shadowed = decision.shadowed,
            record_id = %decision.record_id,
            "governance decision"
        );
        Ok(decision)
    }
}
