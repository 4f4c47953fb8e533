//! Replay verification of a per-agent chain.
//!
//! Records are re-ordered by timestamp (sequence breaks ties) before
//! verification, so the check holds even when the store returned them
//! out of order. A break is localized to the first failing record;
//! everything before it stays attested.

use serde::{Deserialize, Serialize};

use crate::record::{ActionRecord, GENESIS_HASH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreakKind {
    /// The record's stored leaf hash does not match its content.
    ContentMismatch,
    /// The record's previous hash does not match the prior leaf hash.
    LinkMismatch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainBreak {
    pub record_id: String,
    pub sequence: u64,
    pub kind: ChainBreakKind,
    pub expected: String,
    pub actual: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainVerificationReport {
    pub valid: bool,
    pub total_records: usize,
    pub verified_records: usize,
    pub first_break: Option<ChainBreak>,
}

/// Verify one agent's records end to end.
pub fn verify_action_chain(records: &[ActionRecord]) -> ChainVerificationReport {
    let mut ordered: Vec<&ActionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.sequence.cmp(&b.sequence))
    });

    let mut expected_previous = GENESIS_HASH.to_string();
    for (verified, record) in ordered.iter().enumerate() {
        let expected_leaf = record.expected_leaf_hash();
        if record.merkle_leaf_hash != expected_leaf {
            return broken(
                records.len(),
                verified,
                record,
                ChainBreakKind::ContentMismatch,
                expected_leaf,
                record.merkle_leaf_hash.clone(),
            );
        }
        if record.previous_hash != expected_previous {
            return broken(
                records.len(),
                verified,
                record,
                ChainBreakKind::LinkMismatch,
                expected_previous,
                record.previous_hash.clone(),
            );
        }
        expected_previous = record.merkle_leaf_hash.clone();
    }

    ChainVerificationReport {
        valid: true,
        total_records: records.len(),
        verified_records: records.len(),
        first_break: None,
    }
}

fn broken(
    total: usize,
    verified: usize,
    record: &ActionRecord,
    kind: ChainBreakKind,
    expected: String,
    actual: String,
) -> ChainVerificationReport {
    ChainVerificationReport {
        valid: false,
        total_records: total,
        verified_records: verified,
        first_break: Some(ChainBreak {
            record_id: record.id.clone(),
            sequence: record.sequence,
            kind,
            expected,
            actual,
        }),
    }
}
