//! Background Merkle batching and external anchoring.
//!
//! Completed chain activity is pushed as `ChainEvent`s into a queue. The
//! batcher drains the queue into fixed-size `TruthBatch`es, each carrying
//! the Merkle root over its event leaf hashes, and periodically hands
//! unanchored roots to a pluggable `Anchorer`. Anchor failures are logged
//! and retried on the next cycle; they never lose the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::canonical::canonical_bytes;
use crate::merkle::MerkleTree;
use crate::record::ActionRecord;
use crate::signer::sha256_hex;
use crate::store::BatchStore;
use crate::ChainError;

/// One batched unit of chain activity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub id: String,
    pub event_type: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl ChainEvent {
    pub fn new(event_type: impl Into<String>, payload: Value, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            payload,
            timestamp: now,
        }
    }

    /// Event for a completed action record, carrying its final leaf hash.
    pub fn from_record(record: &ActionRecord) -> Self {
        Self::new(
            "action_completed",
            json!({
                "recordId": record.id,
                "agentId": record.agent_id,
                "actionType": record.action_type,
                "merkleLeafHash": record.merkle_leaf_hash,
            }),
            record.timestamp,
        )
    }

    /// Merkle leaf for this event: hash of its canonical JSON form.
    pub fn leaf_hash(&self) -> String {
        sha256_hex(&canonical_bytes(&json!({
            "id": self.id,
            "eventType": self.event_type,
            "payload": self.payload,
            "timestamp": self.timestamp.to_rfc3339(),
        })))
    }
}

/// A sealed batch with its Merkle root. `anchor_receipt` is set once the
/// root has been anchored externally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruthBatch {
    pub id: String,
    pub merkle_root: String,
    pub events: Vec<ChainEvent>,
    pub created_at: DateTime<Utc>,
    pub anchor_receipt: Option<String>,
}

/// External anchor target (timestamping service, public log, etc).
#[async_trait]
pub trait Anchorer: Send + Sync {
    async fn anchor(&self, batch: &TruthBatch) -> Result<String, ChainError>;
}

#[derive(Clone, Debug)]
pub struct BatcherConfig {
    pub batch_size: usize,
    pub max_queue: usize,
    pub flush_interval: Duration,
    pub anchor_interval: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_queue: 1000,
            flush_interval: Duration::from_secs(60),
            anchor_interval: Duration::from_secs(3600),
        }
    }
}

pub struct TruthBatcher {
    config: BatcherConfig,
    store: Arc<dyn BatchStore>,
    queue: Mutex<Vec<ChainEvent>>,
    flushing: AtomicBool,
}

impl TruthBatcher {
    pub fn new(config: BatcherConfig, store: Arc<dyn BatchStore>) -> Self {
        Self {
            config,
            store,
            queue: Mutex::new(Vec::new()),
            flushing: AtomicBool::new(false),
        }
    }

    /// Enqueue an event and return immediately. The scheduled flush timer
    /// is the normal drain path; push only flushes out-of-band when the
    /// queue overflows its cap.
    pub fn push(&self, event: ChainEvent, now: DateTime<Utc>) -> Result<(), ChainError> {
        self.queue.lock().push(event);
        while self.queue.lock().len() > self.config.max_queue {
            // A skipped flush means another thread is already draining.
            if self.flush(now)?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Drain up to one batch worth of events into a sealed `TruthBatch`.
    ///
    /// Re-entrant calls (timer tick racing an inline flush) are skipped
    /// rather than serialized; the loser's events go out next cycle.
    pub fn flush(&self, now: DateTime<Utc>) -> Result<Option<TruthBatch>, ChainError> {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let result = self.flush_inner(now);
        self.flushing.store(false, Ordering::Release);
        result
    }

    fn flush_inner(&self, now: DateTime<Utc>) -> Result<Option<TruthBatch>, ChainError> {
        let events: Vec<ChainEvent> = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return Ok(None);
            }
            let take = queue.len().min(self.config.batch_size);
            queue.drain(..take).collect()
        };

        let leaves: Vec<String> = events.iter().map(ChainEvent::leaf_hash).collect();
        let tree = MerkleTree::build(&leaves)?;
        let batch = TruthBatch {
            id: uuid::Uuid::new_v4().to_string(),
            merkle_root: tree.root().to_string(),
            events,
            created_at: now,
            anchor_receipt: None,
        };
        self.store.save(batch.clone())?;
        debug!(
            batch_id = %batch.id,
            events = batch.events.len(),
            merkle_root = %batch.merkle_root,
            "truth batch sealed"
        );
        Ok(Some(batch))
    }

    /// Try to anchor every unanchored batch. Failures are retried on the
    /// next anchor cycle.
    pub async fn anchor_pending(&self, anchorer: &dyn Anchorer) -> Result<usize, ChainError> {
        let mut anchored = 0;
        for batch in self.store.unanchored()? {
            match anchorer.anchor(&batch).await {
                Ok(receipt) => {
                    self.store.mark_anchored(&batch.id, receipt)?;
                    info!(batch_id = %batch.id, "batch anchored");
                    anchored += 1;
                }
                Err(err) => {
                    warn!(batch_id = %batch.id, error = %err, "anchoring failed, will retry");
                }
            }
        }
        Ok(anchored)
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run flush and anchor timers until the handle is shut down.
    pub fn spawn(self: Arc<Self>, anchorer: Arc<dyn Anchorer>) -> BatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let batcher = Arc::clone(&self);
        let task = tokio::spawn(async move {
            let mut flush_tick = tokio::time::interval(batcher.config.flush_interval);
            let mut anchor_tick = tokio::time::interval(batcher.config.anchor_interval);
            // The first tick of an interval fires immediately.
            flush_tick.tick().await;
            anchor_tick.tick().await;
            loop {
                tokio::select! {
                    _ = flush_tick.tick() => {
                        if let Err(err) = batcher.flush(Utc::now()) {
                            warn!(error = %err, "scheduled flush failed");
                        }
                    }
                    _ = anchor_tick.tick() => {
                        if let Err(err) = batcher.anchor_pending(anchorer.as_ref()).await {
                            warn!(error = %err, "scheduled anchoring failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        // Final drain so shutdown never strands queued events.
                        while batcher.queued() > 0 {
                            if batcher.flush(Utc::now()).is_err() {
                                break;
                            }
                        }
                        if let Err(err) = batcher.anchor_pending(anchorer.as_ref()).await {
                            warn!(error = %err, "final anchoring failed");
                        }
                        return;
                    }
                }
            }
        });
        BatcherHandle { shutdown_tx, task }
    }
}

/// Handle to a running batcher task.
pub struct BatcherHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BatcherHandle {
    /// Signal shutdown and wait for the final drain to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
