//! Scoped, time-boxed session tokens.
//!
//! A token's scope must be a subset of what the permission matrix allows
//! for its layer pair; anything broader is refused at issuance. Expiry is
//! checked at every lookup. The cleanup sweep only reclaims memory and is
//! never the source of truth.

use std::collections::HashMap;

use accord_types::Layer;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use accord_chain::canonical::canonical_bytes;
use accord_chain::RecordSigner;

use crate::matrix::pair_capabilities;
use crate::AuthError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub id: String,
    pub from_layer: Layer,
    pub to_layer: Layer,
    pub scope: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signature: String,
}

impl SessionToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn permits(&self, action: &str) -> bool {
        self.scope.iter().any(|s| s == action)
    }

    fn signable_bytes(&self) -> Vec<u8> {
        canonical_bytes(&json!({
            "id": self.id,
            "fromLayer": self.from_layer,
            "toLayer": self.to_layer,
            "scope": self.scope,
            "issuedAt": self.issued_at.to_rfc3339(),
            "expiresAt": self.expires_at.to_rfc3339(),
        }))
    }

    pub fn verify_signature(&self, signer: &RecordSigner) -> bool {
        signer.verify(&self.signable_bytes(), &self.signature)
    }
}

pub struct SessionManager {
    signer: RecordSigner,
    tokens: RwLock<HashMap<String, SessionToken>>,
}

impl SessionManager {
    pub fn new(signer: RecordSigner) -> Self {
        Self {
            signer,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a token, or refuse with `None` when the requested scope is not
    /// a subset of the matrix entry for the pair.
    pub fn issue(
        &self,
        from: Layer,
        to: Layer,
        scope: &[&str],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<SessionToken> {
        let allowed = pair_capabilities(from, to)?;
        let excess: Vec<&str> = scope
            .iter()
            .filter(|s| !allowed.contains(*s))
            .copied()
            .collect();
        if !excess.is_empty() {
            warn!(
                from = %from,
                to = %to,
                excess = ?excess,
                "session scope exceeds the permission matrix, refusing"
            );
            return None;
        }

        let mut token = SessionToken {
            id: uuid::Uuid::new_v4().to_string(),
            from_layer: from,
            to_layer: to,
            scope: scope.iter().map(|s| s.to_string()).collect(),
            issued_at: now,
            expires_at: now + ttl,
            signature: String::new(),
        };
        token.signature = self.signer.sign(&token.signable_bytes());
        self.tokens.write().insert(token.id.clone(), token.clone());
        info!(token_id = %token.id, from = %from, to = %to, "session token issued");
        Some(token)
    }

    /// Look up a token; expired tokens are rejected and dropped even if the
    /// cleanup sweep has not seen them yet.
    pub fn validate(&self, token_id: &str, now: DateTime<Utc>) -> Result<SessionToken, AuthError> {
        let mut tokens = self.tokens.write();
        let token = tokens
            .get(token_id)
            .ok_or_else(|| AuthError::SessionNotFound(token_id.to_string()))?;
        if token.is_expired(now) {
            tokens.remove(token_id);
            return Err(AuthError::SessionExpired(token_id.to_string()));
        }
        if !token.verify_signature(&self.signer) {
            tokens.remove(token_id);
            return Err(AuthError::SessionNotFound(token_id.to_string()));
        }
        Ok(token.clone())
    }

    /// Drop every expired token. Memory reclamation only.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired(now));
        before - tokens.len()
    }

    /// Revoke every session that references the layer on either side.
    pub fn revoke_for_layer(&self, layer: Layer) -> usize {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, token| token.from_layer != layer && token.to_layer != layer);
        before - tokens.len()
    }

    pub fn active_count(&self) -> usize {
        self.tokens.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(RecordSigner::new(b"session-test-key"))
    }

    fn t0() -> DateTime<Utc> {
        "2026-02-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn subset_scope_is_issued_and_validates() {
        let manager = manager();
        let token = manager
            .issue(
                Layer::Runtime,
                Layer::Observer,
                &["emit_event"],
                Duration::hours(1),
                t0(),
            )
            .unwrap();
        assert!(token.permits("emit_event"));
        assert!(!token.permits("report_metric"));
        assert!(manager.validate(&token.id, t0()).is_ok());
    }

    #[test]
    fn expiry_is_enforced_at_lookup_before_any_cleanup() {
        let manager = manager();
        let token = manager
            .issue(
                Layer::Runtime,
                Layer::Observer,
                &["emit_event"],
                Duration::minutes(5),
                t0(),
            )
            .unwrap();
        let later = t0() + Duration::minutes(6);
        assert!(matches!(
            manager.validate(&token.id, later),
            Err(AuthError::SessionExpired(_))
        ));
        // Rejected token is dropped eagerly.
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn cleanup_reclaims_expired_tokens() {
        let manager = manager();
        manager
            .issue(Layer::Runtime, Layer::Observer, &["emit_event"], Duration::minutes(5), t0())
            .unwrap();
        manager
            .issue(Layer::Runtime, Layer::Observer, &["emit_event"], Duration::hours(5), t0())
            .unwrap();
        assert_eq!(manager.cleanup(t0() + Duration::hours(1)), 1);
        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn scope_outside_the_matrix_is_refused() {
        let manager = manager();
        assert!(manager
            .issue(
                Layer::Runtime,
                Layer::Observer,
                &["emit_event", "execute_action"],
                Duration::hours(1),
                t0(),
            )
            .is_none());
        // Pair with no matrix entry at all.
        assert!(manager
            .issue(Layer::Human, Layer::Runtime, &[], Duration::hours(1), t0())
            .is_none());
    }

    #[test]
    fn revoke_for_layer_hits_both_directions() {
        let manager = manager();
        manager
            .issue(Layer::Autonomy, Layer::Council, &["request_vote"], Duration::hours(1), t0())
            .unwrap();
        manager
            .issue(Layer::Council, Layer::Human, &["request_review"], Duration::hours(1), t0())
            .unwrap();
        manager
            .issue(Layer::Runtime, Layer::Observer, &["emit_event"], Duration::hours(1), t0())
            .unwrap();
        assert_eq!(manager.revoke_for_layer(Layer::Council), 2);
        assert_eq!(manager.active_count(), 1);
    }
}
