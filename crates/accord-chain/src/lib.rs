//! Accord Chain - the tamper-evident audit trail
//!
//! Every governance decision becomes a hash-linked `ActionRecord`:
//! `previous_hash` of record *n* equals the Merkle leaf hash of record *n-1*
//! on the same agent's chain, the genesis link is 64 zero hex characters, and
//! each record is signed with a keyed hash over its canonical (sorted-key)
//! JSON form.
//!
//! Records are two-phase: a draft is sealed into a pending record, and
//! completion attaches the result and re-hashes/re-signs it. The chain link
//! value is the *final* hash, so completion must happen before the next
//! record is created for the same agent; this crate enforces that rather
//! than letting the chain break silently.
//!
//! Completed records are pushed to a background batcher that groups them
//! into fixed-size Merkle-batched bundles and anchors roots externally via
//! a pluggable collaborator. The batcher never blocks the synchronous
//! governance path.

#![deny(unsafe_code)]

pub mod batch;
pub mod canonical;
pub mod chain;
pub mod merkle;
pub mod proof;
pub mod record;
pub mod signer;
pub mod store;
pub mod verify;

pub use batch::{Anchorer, BatcherConfig, BatcherHandle, ChainEvent, TruthBatch, TruthBatcher};
pub use chain::ActionChain;
pub use merkle::{MerkleProof, MerkleTree};
pub use proof::{AbsenceProof, EventProof};
pub use record::{ActionRecord, DraftActionRecord, GENESIS_HASH};
pub use signer::RecordSigner;
pub use store::{BatchStore, InMemoryBatchStore, InMemoryRecordStore, RecordStore};
pub use verify::{verify_action_chain, ChainBreak, ChainBreakKind, ChainVerificationReport};

use thiserror::Error;

/// Errors raised by chain maintenance. Verification failures are reported as
/// values (`ChainVerificationReport`), not as this error.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("record {record_id} for agent {agent_id} is still pending completion")]
    PendingCompletion { agent_id: String, record_id: String },

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record {0} is already completed; records are mutated exactly once")]
    AlreadyCompleted(String),

    #[error("cannot build a Merkle tree from zero leaves")]
    EmptyTree,

    #[error("leaf index {index} out of range for a tree of {leaf_count} leaves")]
    LeafOutOfRange { index: usize, leaf_count: usize },

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    #[error("event {event_id} is not part of batch {batch_id}")]
    EventNotInBatch { batch_id: String, event_id: String },

    #[error("absence contradicted: {record_count} matching record(s) exist in the range")]
    AbsenceContradicted { record_count: usize },

    #[error("anchoring failed: {0}")]
    Anchor(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
