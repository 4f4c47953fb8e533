//! Action records - the two-phase, hash-linked audit unit.
//!
//! A record is created as a *pending* entry (sealed draft) and mutated
//! exactly once, when `complete` attaches the result. Completion recomputes
//! both the leaf hash and the signature: the chain link value is always the
//! final hash. Consumers that cached the pre-completion hash must refresh.
//!
//! Wire field names are camelCase verbatim for compatibility with
//! independent chain verifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::canonical_bytes;
use crate::signer::{sha256_hex, RecordSigner};

/// Chain link for the first record of every agent chain.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Unsealed record data, before it carries any chain position.
#[derive(Clone, Debug)]
pub struct DraftActionRecord {
    pub agent_id: String,
    pub action_type: String,
    pub parameters: Value,
    pub context: Value,
}

impl DraftActionRecord {
    pub fn new(
        agent_id: impl Into<String>,
        action_type: impl Into<String>,
        parameters: Value,
        context: Value,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action_type: action_type.into(),
            parameters,
            context,
        }
    }

    /// Seal the draft into a pending record at a chain position.
    pub fn seal(
        self,
        sequence: u64,
        previous_hash: impl Into<String>,
        signer: &RecordSigner,
        now: DateTime<Utc>,
    ) -> ActionRecord {
        let mut record = ActionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: self.agent_id,
            action_type: self.action_type,
            parameters: self.parameters,
            context: self.context,
            sequence,
            previous_hash: previous_hash.into(),
            state_hash: String::new(),
            timestamp: now,
            signature: String::new(),
            observer_signatures: Vec::new(),
            merkle_leaf_hash: String::new(),
            result: None,
        };
        record.rehash(signer);
        record
    }
}

/// A sealed, hash-linked audit record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: String,
    pub agent_id: String,
    pub action_type: String,
    pub parameters: Value,
    pub context: Value,
    pub sequence: u64,
    pub previous_hash: String,
    pub state_hash: String,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
    pub observer_signatures: Vec<String>,
    pub merkle_leaf_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ActionRecord {
    /// The canonical signable form: everything except the signature fields
    /// and the leaf hash derived from it.
    pub fn signable_value(&self) -> Value {
        json!({
            "id": self.id,
            "agentId": self.agent_id,
            "actionType": self.action_type,
            "parameters": self.parameters,
            "context": self.context,
            "sequence": self.sequence,
            "previousHash": self.previous_hash,
            "stateHash": self.state_hash,
            "timestamp": self.timestamp.to_rfc3339(),
            "result": self.result,
        })
    }

    /// Leaf hash this record should carry given its current content.
    pub fn expected_leaf_hash(&self) -> String {
        sha256_hex(&canonical_bytes(&self.signable_value()))
    }

    /// Whether completion has attached a result.
    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    /// Attach the result and re-hash/re-sign. The leaf hash changes here;
    /// any previously issued chain link to this record is stale after this.
    pub fn complete(&mut self, result: Value, signer: &RecordSigner) {
        self.result = Some(result);
        self.rehash(signer);
    }

    /// Countersign the current content as an observer.
    pub fn add_observer_signature(&mut self, observer: &RecordSigner) {
        let bytes = canonical_bytes(&self.signable_value());
        self.observer_signatures.push(observer.sign(&bytes));
    }

    /// Verify the primary signature against the current content.
    pub fn verify_signature(&self, signer: &RecordSigner) -> bool {
        signer.verify(&canonical_bytes(&self.signable_value()), &self.signature)
    }

    fn rehash(&mut self, signer: &RecordSigner) {
        self.state_hash = sha256_hex(&canonical_bytes(&json!({
            "parameters": self.parameters,
            "context": self.context,
            "result": self.result,
        })));
        let bytes = canonical_bytes(&self.signable_value());
        self.merkle_leaf_hash = sha256_hex(&bytes);
        self.signature = signer.sign(&bytes);
        // Prior observer signatures covered the old content.
        self.observer_signatures.clear();
    }
}
