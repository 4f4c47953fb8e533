//! Storage seams for records and batches.
//!
//! The in-memory stores cover tests and single-process deployment. A
//! durable backend plugs in behind the same traits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::batch::TruthBatch;
use crate::record::ActionRecord;
use crate::ChainError;

/// Filter for record queries. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct RecordQuery {
    pub agent_id: Option<String>,
    pub action_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RecordQuery {
    pub fn matches(&self, record: &ActionRecord) -> bool {
        if let Some(agent_id) = &self.agent_id {
            if record.agent_id != *agent_id {
                return false;
            }
        }
        if let Some(action_type) = &self.action_type {
            if record.action_type != *action_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.timestamp > to {
                return false;
            }
        }
        true
    }
}

pub trait RecordStore: Send + Sync {
    fn append(&self, record: ActionRecord) -> Result<(), ChainError>;
    fn get(&self, id: &str) -> Result<Option<ActionRecord>, ChainError>;
    /// Replace a stored record in place, keyed by id.
    fn update(&self, record: ActionRecord) -> Result<(), ChainError>;
    /// All records for one agent, in append order.
    fn by_agent(&self, agent_id: &str) -> Result<Vec<ActionRecord>, ChainError>;
    fn query(&self, query: &RecordQuery) -> Result<Vec<ActionRecord>, ChainError>;
}

pub trait BatchStore: Send + Sync {
    fn save(&self, batch: TruthBatch) -> Result<(), ChainError>;
    fn get(&self, id: &str) -> Result<Option<TruthBatch>, ChainError>;
    fn unanchored(&self) -> Result<Vec<TruthBatch>, ChainError>;
    fn mark_anchored(&self, id: &str, receipt: String) -> Result<(), ChainError>;
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    // Append order doubles as per-agent chain order.
    records: RwLock<Vec<ActionRecord>>,
    index: RwLock<HashMap<String, usize>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn append(&self, record: ActionRecord) -> Result<(), ChainError> {
        let mut records = self.records.write();
        self.index.write().insert(record.id.clone(), records.len());
        records.push(record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ActionRecord>, ChainError> {
        let index = self.index.read();
        Ok(index.get(id).map(|&i| self.records.read()[i].clone()))
    }

    fn update(&self, record: ActionRecord) -> Result<(), ChainError> {
        let index = self.index.read();
        match index.get(&record.id) {
            Some(&i) => {
                self.records.write()[i] = record;
                Ok(())
            }
            None => Err(ChainError::RecordNotFound(record.id)),
        }
    }

    fn by_agent(&self, agent_id: &str) -> Result<Vec<ActionRecord>, ChainError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect())
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<ActionRecord>, ChainError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<HashMap<String, TruthBatch>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchStore for InMemoryBatchStore {
    fn save(&self, batch: TruthBatch) -> Result<(), ChainError> {
        self.batches.write().insert(batch.id.clone(), batch);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<TruthBatch>, ChainError> {
        Ok(self.batches.read().get(id).cloned())
    }

    fn unanchored(&self) -> Result<Vec<TruthBatch>, ChainError> {
        let mut pending: Vec<TruthBatch> = self
            .batches
            .read()
            .values()
            .filter(|b| b.anchor_receipt.is_none())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    fn mark_anchored(&self, id: &str, receipt: String) -> Result<(), ChainError> {
        let mut batches = self.batches.write();
        match batches.get_mut(id) {
            Some(batch) => {
                batch.anchor_receipt = Some(receipt);
                Ok(())
            }
            None => Err(ChainError::BatchNotFound(id.to_string())),
        }
    }
}
