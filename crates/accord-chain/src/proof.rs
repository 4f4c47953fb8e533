//! Portable proofs over batched chain data.
//!
//! `EventProof` shows one event is inside an anchored batch without
//! shipping the whole batch. `AbsenceProof` is a signed attestation that
//! no matching record exists in a time range; generation fails if any
//! matching record does exist, so a proof can never contradict the store
//! it was issued from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::batch::TruthBatch;
use crate::canonical::canonical_bytes;
use crate::merkle::{MerkleProof, MerkleTree};
use crate::record::GENESIS_HASH;
use crate::signer::RecordSigner;
use crate::store::{RecordQuery, RecordStore};
use crate::ChainError;

/// Inclusion proof for one event of a sealed batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProof {
    pub batch_id: String,
    pub event_id: String,
    pub merkle_proof: MerkleProof,
    pub anchor_receipt: Option<String>,
}

impl EventProof {
    pub fn generate(batch: &TruthBatch, event_id: &str) -> Result<Self, ChainError> {
        let index = batch
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| ChainError::EventNotInBatch {
                batch_id: batch.id.clone(),
                event_id: event_id.to_string(),
            })?;

        let leaves: Vec<String> = batch.events.iter().map(|e| e.leaf_hash()).collect();
        let tree = MerkleTree::build(&leaves)?;
        Ok(Self {
            batch_id: batch.id.clone(),
            event_id: event_id.to_string(),
            merkle_proof: tree.generate_proof(index)?,
            anchor_receipt: batch.anchor_receipt.clone(),
        })
    }

    /// Check the sibling path against the expected batch root.
    pub fn verify(&self, merkle_root: &str) -> bool {
        self.merkle_proof.root == merkle_root && self.merkle_proof.verify()
    }
}

/// Signed attestation that no matching record exists in a window.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceProof {
    pub agent_id: String,
    pub action_type: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Agent chain head at attestation time; genesis when the agent has
    /// no records at all.
    pub chain_head: String,
    /// Root of the latest sealed truth batch at attestation time; genesis
    /// when nothing has been batched yet.
    pub merkle_root: String,
    /// Matching records found in the range. Always zero; the count is
    /// signed so the attestation states it explicitly.
    pub record_count: usize,
    pub attested_at: DateTime<Utc>,
    pub signature: String,
}

impl AbsenceProof {
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        store: &dyn RecordStore,
        agent_id: &str,
        action_type: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        merkle_root: &str,
        signer: &RecordSigner,
        now: DateTime<Utc>,
    ) -> Result<Self, ChainError> {
        let matches = store.query(&RecordQuery {
            agent_id: Some(agent_id.to_string()),
            action_type: Some(action_type.to_string()),
            from: Some(from),
            to: Some(to),
        })?;
        if !matches.is_empty() {
            return Err(ChainError::AbsenceContradicted {
                record_count: matches.len(),
            });
        }

        let chain_head = store
            .by_agent(agent_id)?
            .last()
            .map(|r| r.merkle_leaf_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut proof = Self {
            agent_id: agent_id.to_string(),
            action_type: action_type.to_string(),
            from,
            to,
            chain_head,
            merkle_root: merkle_root.to_string(),
            record_count: 0,
            attested_at: now,
            signature: String::new(),
        };
        proof.signature = signer.sign(&proof.signable_bytes());
        Ok(proof)
    }

    pub fn verify(&self, signer: &RecordSigner) -> bool {
        signer.verify(&self.signable_bytes(), &self.signature)
    }

    fn signable_bytes(&self) -> Vec<u8> {
        canonical_bytes(&json!({
            "agentId": self.agent_id,
            "actionType": self.action_type,
            "from": self.from.to_rfc3339(),
            "to": self.to.to_rfc3339(),
            "chainHead": self.chain_head,
            "merkleRoot": self.merkle_root,
            "recordCount": self.record_count,
            "attestedAt": self.attested_at.to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ChainEvent;
    use crate::record::DraftActionRecord;
    use crate::store::InMemoryRecordStore;
    use serde_json::json;

    fn signer() -> RecordSigner {
        RecordSigner::new(b"proof-test-key")
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn batch(n: usize) -> TruthBatch {
        let events: Vec<ChainEvent> = (0..n)
            .map(|i| ChainEvent::new("action_completed", json!({"i": i}), at("2026-02-01T00:00:00Z")))
            .collect();
        let leaves: Vec<String> = events.iter().map(ChainEvent::leaf_hash).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        TruthBatch {
            id: "batch-1".into(),
            merkle_root: tree.root().to_string(),
            events,
            created_at: at("2026-02-01T00:01:00Z"),
            anchor_receipt: Some("receipt-1".into()),
        }
    }

    #[test]
    fn event_proof_verifies_against_the_batch_root() {
        let batch = batch(5);
        let event_id = batch.events[3].id.clone();
        let proof = EventProof::generate(&batch, &event_id).unwrap();
        assert!(proof.verify(&batch.merkle_root));
        assert!(!proof.verify(&crate::signer::sha256_hex(b"other root")));
        assert_eq!(proof.anchor_receipt.as_deref(), Some("receipt-1"));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let batch = batch(2);
        assert!(matches!(
            EventProof::generate(&batch, "missing"),
            Err(ChainError::EventNotInBatch { .. })
        ));
    }

    #[test]
    fn absence_proof_is_issued_when_no_record_matches() {
        let store = InMemoryRecordStore::new();
        store
            .append(
                DraftActionRecord::new("a", "read_data", json!({}), json!({}))
                    .seal(0, GENESIS_HASH, &signer(), at("2026-02-01T00:00:00Z")),
            )
            .unwrap();

        let root = crate::signer::sha256_hex(b"batch root");
        let proof = AbsenceProof::generate(
            &store,
            "a",
            "financial_transfer",
            at("2026-01-01T00:00:00Z"),
            at("2026-03-01T00:00:00Z"),
            &root,
            &signer(),
            at("2026-03-02T00:00:00Z"),
        )
        .unwrap();
        assert!(proof.verify(&signer()));
        assert_ne!(proof.chain_head, GENESIS_HASH);
        assert_eq!(proof.merkle_root, root);
        assert_eq!(proof.record_count, 0);
    }

    #[test]
    fn matching_record_contradicts_absence() {
        let store = InMemoryRecordStore::new();
        store
            .append(
                DraftActionRecord::new("a", "financial_transfer", json!({}), json!({}))
                    .seal(0, GENESIS_HASH, &signer(), at("2026-02-01T00:00:00Z")),
            )
            .unwrap();

        let err = AbsenceProof::generate(
            &store,
            "a",
            "financial_transfer",
            at("2026-01-01T00:00:00Z"),
            at("2026-03-01T00:00:00Z"),
            GENESIS_HASH,
            &signer(),
            at("2026-03-02T00:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::AbsenceContradicted { record_count: 1 }));
    }

    #[test]
    fn tampered_attestation_fails_verification() {
        let store = InMemoryRecordStore::new();
        let mut proof = AbsenceProof::generate(
            &store,
            "a",
            "financial_transfer",
            at("2026-01-01T00:00:00Z"),
            at("2026-03-01T00:00:00Z"),
            GENESIS_HASH,
            &signer(),
            at("2026-03-02T00:00:00Z"),
        )
        .unwrap();
        proof.agent_id = "b".into();
        assert!(!proof.verify(&signer()));
    }

    #[test]
    fn attestation_binds_the_batch_root_and_count() {
        let store = InMemoryRecordStore::new();
        let proof = AbsenceProof::generate(
            &store,
            "a",
            "financial_transfer",
            at("2026-01-01T00:00:00Z"),
            at("2026-03-01T00:00:00Z"),
            GENESIS_HASH,
            &signer(),
            at("2026-03-02T00:00:00Z"),
        )
        .unwrap();

        let mut reanchored = proof.clone();
        reanchored.merkle_root = crate::signer::sha256_hex(b"other root");
        assert!(!reanchored.verify(&signer()));

        let mut recounted = proof;
        recounted.record_count = 1;
        assert!(!recounted.verify(&signer()));
    }
}
