//! Layer identity certificates.
//!
//! Each governance layer holds a short-lived identity derived from the
//! permission matrix. The certificate hash covers every identity field, so
//! any edit (extra capability, stretched expiry) is detectable. Identities
//! expire after 24 hours and must be rotated.

use std::collections::HashMap;

use accord_types::Layer;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use accord_chain::canonical::canonical_bytes;
use accord_chain::signer::sha256_hex;

use crate::matrix::outgoing_capabilities;
use crate::AuthError;

pub const IDENTITY_TTL_HOURS: i64 = 24;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerIdentity {
    pub layer_id: String,
    pub layer: Layer,
    pub public_key: String,
    pub certificate_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub capabilities: Vec<String>,
}

impl LayerIdentity {
    fn issue(layer: Layer, now: DateTime<Utc>) -> Self {
        let layer_id = uuid::Uuid::new_v4().to_string();
        // Keyed-hash placeholder for a real key pair; the certificate
        // contract (tamper evidence, expiry) is what matters here.
        let public_key = sha256_hex(format!("{layer}:{layer_id}").as_bytes());
        let capabilities: Vec<String> = outgoing_capabilities(layer)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut identity = Self {
            layer_id,
            layer,
            public_key,
            certificate_hash: String::new(),
            issued_at: now,
            expires_at: now + Duration::hours(IDENTITY_TTL_HOURS),
            capabilities,
        };
        identity.certificate_hash = identity.expected_certificate_hash();
        identity
    }

    pub fn expected_certificate_hash(&self) -> String {
        sha256_hex(&canonical_bytes(&json!({
            "layerId": self.layer_id,
            "layer": self.layer,
            "publicKey": self.public_key,
            "issuedAt": self.issued_at.to_rfc3339(),
            "expiresAt": self.expires_at.to_rfc3339(),
            "capabilities": self.capabilities,
        })))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// In-memory registry of current layer identities.
#[derive(Default)]
pub struct IdentityRegistry {
    identities: RwLock<HashMap<Layer, LayerIdentity>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh identity, replacing any existing one for the layer.
    pub fn issue(&self, layer: Layer, now: DateTime<Utc>) -> LayerIdentity {
        let identity = LayerIdentity::issue(layer, now);
        info!(
            layer = %layer,
            layer_id = %identity.layer_id,
            expires_at = %identity.expires_at,
            "layer identity issued"
        );
        self.identities.write().insert(layer, identity.clone());
        identity
    }

    /// Rotation is re-issuance; the old certificate stops verifying because
    /// the registry only holds the current one.
    pub fn rotate(&self, layer: Layer, now: DateTime<Utc>) -> LayerIdentity {
        self.issue(layer, now)
    }

    pub fn get(&self, layer: Layer) -> Option<LayerIdentity> {
        self.identities.read().get(&layer).cloned()
    }

    /// Verify the layer's current certificate: present, hash-intact, unexpired.
    pub fn verify(&self, layer: Layer, now: DateTime<Utc>) -> Result<(), AuthError> {
        let identities = self.identities.read();
        let identity = identities
            .get(&layer)
            .ok_or(AuthError::UnknownIdentity(layer))?;
        if identity.certificate_hash != identity.expected_certificate_hash() {
            return Err(AuthError::CertificateMismatch(layer));
        }
        if identity.is_expired(now) {
            return Err(AuthError::IdentityExpired(layer));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-02-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn issued_identity_verifies_until_expiry() {
        let registry = IdentityRegistry::new();
        registry.issue(Layer::Runtime, t0());
        assert!(registry.verify(Layer::Runtime, t0()).is_ok());
        assert!(registry
            .verify(Layer::Runtime, t0() + Duration::hours(23))
            .is_ok());
        assert!(matches!(
            registry.verify(Layer::Runtime, t0() + Duration::hours(25)),
            Err(AuthError::IdentityExpired(Layer::Runtime))
        ));
    }

    #[test]
    fn unregistered_layer_fails_verification() {
        let registry = IdentityRegistry::new();
        assert!(matches!(
            registry.verify(Layer::Council, t0()),
            Err(AuthError::UnknownIdentity(Layer::Council))
        ));
    }

    #[test]
    fn tampered_certificate_is_detected() {
        let registry = IdentityRegistry::new();
        let mut identity = registry.issue(Layer::Policy, t0());
        identity.capabilities.push("grant_everything".into());
        assert_ne!(identity.certificate_hash, identity.expected_certificate_hash());

        registry.identities.write().insert(Layer::Policy, identity);
        assert!(matches!(
            registry.verify(Layer::Policy, t0()),
            Err(AuthError::CertificateMismatch(Layer::Policy))
        ));
    }

    #[test]
    fn rotation_replaces_the_certificate() {
        let registry = IdentityRegistry::new();
        let first = registry.issue(Layer::Observer, t0());
        let second = registry.rotate(Layer::Observer, t0() + Duration::hours(12));
        assert_ne!(first.layer_id, second.layer_id);
        assert_eq!(
            registry.get(Layer::Observer).unwrap().layer_id,
            second.layer_id
        );
    }
}
