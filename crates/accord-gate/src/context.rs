//! Request and per-stage context for the governance pipeline.

use accord_capability::{CapabilityDecision, PermissionDecision};
use accord_matrix::{MatrixResult, PolicyCheck};
use accord_risk::RiskAssessment;
use accord_trust::TrustSnapshot;
use accord_types::{ActionContext, AgentId};
use serde_json::Value;

use crate::traits::AgentProfile;

/// One action an agent wants to take.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub agent_id: AgentId,
    /// Doubles as the capability id in the catalog.
    pub action_type: String,
    pub resource: String,
    pub parameters: Value,
    pub context: ActionContext,
}

/// Result of a single pipeline stage.
#[derive(Clone, Debug)]
pub enum StageResult {
    Pass,
    Deny(String),
    /// Request pulled out of the normal path (shadow mode).
    Diverted(String),
}

impl StageResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, StageResult::Pass)
    }
}

/// Accumulates stage outputs as a request flows through the pipeline.
pub struct GateContext {
    pub request: ActionRequest,
    pub profile: Option<AgentProfile>,
    pub trust: Option<TrustSnapshot>,
    pub capability: Option<CapabilityDecision>,
    pub permission: Option<PermissionDecision>,
    pub risk: Option<RiskAssessment>,
    pub matrix: Option<MatrixResult>,
    pub policy: Option<PolicyCheck>,
    /// `(stage name, result)` in evaluation order.
    pub stage_results: Vec<(String, StageResult)>,
}

impl GateContext {
    pub fn new(request: ActionRequest) -> Self {
        Self {
            request,
            profile: None,
            trust: None,
            capability: None,
            permission: None,
            risk: None,
            matrix: None,
            policy: None,
            stage_results: Vec::new(),
        }
    }

    pub fn record_stage(&mut self, stage: impl Into<String>, result: StageResult) {
        self.stage_results.push((stage.into(), result));
    }

    /// Stage names with outcomes, for the audit record.
    pub fn stage_summary(&self) -> Vec<String> {
        self.stage_results
            .iter()
            .map(|(stage, result)| match result {
                StageResult::Pass => format!("{stage}: pass"),
                StageResult::Deny(reason) => format!("{stage}: deny ({reason})"),
                StageResult::Diverted(reason) => format!("{stage}: diverted ({reason})"),
            })
            .collect()
    }
}
