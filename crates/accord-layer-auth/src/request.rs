//! Signed cross-layer requests.

use accord_types::Layer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use accord_chain::canonical::canonical_bytes;
use accord_chain::RecordSigner;

/// Maximum allowed clock skew between signing and verification.
pub const REPLAY_WINDOW_SECS: i64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRequest {
    pub id: String,
    pub from_layer: Layer,
    pub to_layer: Layer,
    pub action: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

impl LayerRequest {
    pub fn create(
        from_layer: Layer,
        to_layer: Layer,
        action: impl Into<String>,
        payload: Value,
        signer: &RecordSigner,
        now: DateTime<Utc>,
    ) -> Self {
        let mut request = Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_layer,
            to_layer,
            action: action.into(),
            payload,
            timestamp: now,
            signature: String::new(),
        };
        request.signature = signer.sign(&request.signable_bytes());
        request
    }

    pub fn verify_signature(&self, signer: &RecordSigner) -> bool {
        signer.verify(&self.signable_bytes(), &self.signature)
    }

    fn signable_bytes(&self) -> Vec<u8> {
        canonical_bytes(&json!({
            "id": self.id,
            "fromLayer": self.from_layer,
            "toLayer": self.to_layer,
            "action": self.action,
            "payload": self.payload,
            "timestamp": self.timestamp.to_rfc3339(),
        }))
    }
}
