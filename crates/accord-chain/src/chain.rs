//! Per-agent hash chain over action records.
//!
//! Each agent owns an independent chain. The head state (sequence, last
//! hash, pending record) lives behind a per-agent mutex so concurrent
//! agents never contend with each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::batch::{ChainEvent, TruthBatcher};
use crate::record::{ActionRecord, DraftActionRecord, GENESIS_HASH};
use crate::signer::RecordSigner;
use crate::store::RecordStore;
use crate::ChainError;

#[derive(Debug)]
struct ChainState {
    sequence: u64,
    last_hash: String,
    pending: Option<String>,
}

impl ChainState {
    fn genesis() -> Self {
        Self {
            sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
            pending: None,
        }
    }
}

/// Append-only chain manager for all agents.
pub struct ActionChain {
    store: Arc<dyn RecordStore>,
    signer: RecordSigner,
    heads: DashMap<String, Arc<Mutex<ChainState>>>,
    batcher: Option<Arc<TruthBatcher>>,
}

impl ActionChain {
    pub fn new(store: Arc<dyn RecordStore>, signer: RecordSigner) -> Self {
        Self {
            store,
            signer,
            heads: DashMap::new(),
            batcher: None,
        }
    }

    /// Forward completed records to a truth batcher for Merkle batching.
    pub fn with_batcher(mut self, batcher: Arc<TruthBatcher>) -> Self {
        self.batcher = Some(batcher);
        self
    }

    fn head(&self, agent_id: &str) -> Arc<Mutex<ChainState>> {
        self.heads
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ChainState::genesis())))
            .clone()
    }

    /// Seal a draft onto the agent's chain as a pending record.
    ///
    /// Fails closed when the agent's previous record has not been
    /// completed: the chain link is the completed leaf hash, so an open
    /// record would leave the next link dangling.
    pub fn create_action_record(
        &self,
        draft: DraftActionRecord,
        now: DateTime<Utc>,
    ) -> Result<ActionRecord, ChainError> {
        let head = self.head(&draft.agent_id);
        let mut state = head.lock();

        if let Some(pending) = &state.pending {
            warn!(
                agent_id = %draft.agent_id,
                record_id = %pending,
                "rejecting new record while previous is uncompleted"
            );
            return Err(ChainError::PendingCompletion {
                agent_id: draft.agent_id,
                record_id: pending.clone(),
            });
        }

        let record = draft.seal(state.sequence, state.last_hash.clone(), &self.signer, now);
        self.store.append(record.clone())?;

        state.pending = Some(record.id.clone());
        debug!(
            agent_id = %record.agent_id,
            record_id = %record.id,
            sequence = record.sequence,
            "action record created"
        );
        Ok(record)
    }

    /// Attach the result to the pending record and advance the chain head.
    pub fn complete_action(&self, record_id: &str, result: Value) -> Result<ActionRecord, ChainError> {
        let agent_id = self
            .store
            .get(record_id)?
            .ok_or_else(|| ChainError::RecordNotFound(record_id.to_string()))?
            .agent_id;

        let head = self.head(&agent_id);
        let mut state = head.lock();

        // Re-fetch under the head lock: completion mutates the record
        // exactly once, so the completed check and the mutation must be
        // atomic with respect to other completions for this agent.
        let mut record = self
            .store
            .get(record_id)?
            .ok_or_else(|| ChainError::RecordNotFound(record_id.to_string()))?;
        if record.is_completed() {
            return Err(ChainError::AlreadyCompleted(record_id.to_string()));
        }

        record.complete(result, &self.signer);
        self.store.update(record.clone())?;

        state.last_hash = record.merkle_leaf_hash.clone();
        state.sequence = record.sequence + 1;
        if state.pending.as_deref() == Some(record_id) {
            state.pending = None;
        }

        // The batcher is downstream of the chain of custody: a batching
        // failure is logged, never surfaced to the completing caller.
        if let Some(batcher) = &self.batcher {
            if let Err(error) = batcher.push(ChainEvent::from_record(&record), record.timestamp) {
                warn!(record_id = %record.id, %error, "failed to enqueue record for batching");
            }
        }

        debug!(
            agent_id = %record.agent_id,
            record_id = %record.id,
            "action record completed"
        );
        Ok(record)
    }

    /// Append a compensating rollback record referencing an earlier action.
    ///
    /// Rollback never removes the original record; the chain stays
    /// append-only and the reversal is itself auditable.
    pub fn record_rollback(
        &self,
        target_record_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionRecord, ChainError> {
        let target = self
            .store
            .get(target_record_id)?
            .ok_or_else(|| ChainError::RecordNotFound(target_record_id.to_string()))?;

        let draft = DraftActionRecord::new(
            target.agent_id.clone(),
            "rollback",
            json!({
                "targetRecordId": target.id,
                "targetActionType": target.action_type,
                "reason": reason,
            }),
            json!({}),
        );
        let record = self.create_action_record(draft, now)?;
        self.complete_action(&record.id, json!({"rolledBack": true}))
    }

    /// The agent's records in chain order.
    pub fn records_for(&self, agent_id: &str) -> Result<Vec<ActionRecord>, ChainError> {
        self.store.by_agent(agent_id)
    }

    pub fn signer(&self) -> &RecordSigner {
        &self.signer
    }
}
