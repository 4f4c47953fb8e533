//! Accord Layer Auth - zero-trust security between governance layers
//!
//! Layers never trust each other implicitly. Every cross-layer call carries
//! a signed canonical payload that is checked against the caller's identity
//! certificate, a 30 second replay window, and the static permission matrix.
//! Authentication failures (bad signature, expired identity, replay) are
//! distinct from authorization denials (pair not permitted, action outside
//! the pair's capabilities) so auditors can tell forgery from overreach.

#![deny(unsafe_code)]

pub mod containment;
pub mod identity;
pub mod limiter;
pub mod matrix;
pub mod request;
pub mod session;

pub use containment::{BlastRadiusContainment, ContainmentEvent};
pub use identity::{IdentityRegistry, LayerIdentity, IDENTITY_TTL_HOURS};
pub use limiter::{LayerRateLimiter, RateDecision, RateLimiterConfig};
pub use matrix::{pair_capabilities, pair_permits};
pub use request::{LayerRequest, REPLAY_WINDOW_SECS};
pub use session::{SessionManager, SessionToken};

use std::sync::Arc;

use accord_types::Layer;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use accord_chain::RecordSigner;

#[derive(Debug, Error)]
pub enum AuthError {
    // Authentication failures: the request itself cannot be trusted.
    #[error("signature mismatch on request {request_id}")]
    SignatureMismatch { request_id: String },

    #[error("request timestamp outside the {REPLAY_WINDOW_SECS}s replay window (skew {skew_secs}s)")]
    ReplayWindowExceeded { skew_secs: i64 },

    #[error("no identity registered for layer {0}")]
    UnknownIdentity(Layer),

    #[error("identity for layer {0} has expired")]
    IdentityExpired(Layer),

    #[error("identity certificate hash mismatch for layer {0}")]
    CertificateMismatch(Layer),

    // Authorization denials: a trusted caller asking for something it may not have.
    #[error("no communication permitted from {from} to {to}")]
    PairNotPermitted { from: Layer, to: Layer },

    #[error("action {action} is outside the {from}->{to} capability set")]
    ActionNotPermitted { from: Layer, to: Layer, action: String },

    #[error("layer {0} is contained")]
    LayerContained(Layer),

    #[error("rate limit exceeded for {from}->{to}, window resets in {resets_in_secs}s")]
    RateLimited {
        from: Layer,
        to: Layer,
        resets_in_secs: i64,
    },

    #[error("session token not found or revoked: {0}")]
    SessionNotFound(String),

    #[error("session token {0} has expired")]
    SessionExpired(String),
}

impl AuthError {
    /// True for failures of trust in the request itself, as opposed to
    /// denials of a well-authenticated caller.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::SignatureMismatch { .. }
                | AuthError::ReplayWindowExceeded { .. }
                | AuthError::UnknownIdentity(_)
                | AuthError::IdentityExpired(_)
                | AuthError::CertificateMismatch(_)
        )
    }
}

/// Facade over identities, request signing, sessions, rate limiting, and
/// containment.
pub struct LayerAuthenticator {
    signer: RecordSigner,
    identities: IdentityRegistry,
    sessions: Arc<SessionManager>,
    containment: BlastRadiusContainment,
    limiter: LayerRateLimiter,
}

impl LayerAuthenticator {
    pub fn new(signer: RecordSigner) -> Self {
        let session_signer = signer.clone();
        Self {
            signer,
            identities: IdentityRegistry::new(),
            sessions: Arc::new(SessionManager::new(session_signer)),
            containment: BlastRadiusContainment::new(),
            limiter: LayerRateLimiter::new(RateLimiterConfig::default()),
        }
    }

    pub fn with_rate_limits(mut self, config: RateLimiterConfig) -> Self {
        self.limiter = LayerRateLimiter::new(config);
        self
    }

    /// Issue (or refresh) the identity certificate for a layer.
    pub fn provision_layer(&self, layer: Layer, now: DateTime<Utc>) -> LayerIdentity {
        self.identities.issue(layer, now)
    }

    /// Build a signed cross-layer request.
    pub fn create_request(
        &self,
        from: Layer,
        to: Layer,
        action: impl Into<String>,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> LayerRequest {
        LayerRequest::create(from, to, action, payload, &self.signer, now)
    }

    /// Full zero-trust check of an inbound request.
    ///
    /// Authentication runs before any authorization logic: a request that
    /// cannot be trusted is rejected without consulting the matrix.
    pub fn authenticate_request(
        &self,
        request: &LayerRequest,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if self.containment.is_contained(request.from_layer) {
            return Err(AuthError::LayerContained(request.from_layer));
        }
        if self.containment.is_contained(request.to_layer) {
            return Err(AuthError::LayerContained(request.to_layer));
        }

        self.identities.verify(request.from_layer, now)?;

        if !request.verify_signature(&self.signer) {
            warn!(
                request_id = %request.id,
                from = %request.from_layer,
                to = %request.to_layer,
                "request signature mismatch"
            );
            return Err(AuthError::SignatureMismatch {
                request_id: request.id.clone(),
            });
        }

        let skew_secs = (now - request.timestamp).num_seconds().abs();
        if skew_secs > REPLAY_WINDOW_SECS {
            return Err(AuthError::ReplayWindowExceeded { skew_secs });
        }

        let capabilities = pair_capabilities(request.from_layer, request.to_layer)
            .ok_or(AuthError::PairNotPermitted {
                from: request.from_layer,
                to: request.to_layer,
            })?;
        if !capabilities.contains(&request.action.as_str()) {
            return Err(AuthError::ActionNotPermitted {
                from: request.from_layer,
                to: request.to_layer,
                action: request.action.clone(),
            });
        }

        // Only authenticated, authorized traffic counts against the window.
        let rate = self.limiter.check(request.from_layer, request.to_layer, now);
        if !rate.allowed {
            return Err(AuthError::RateLimited {
                from: request.from_layer,
                to: request.to_layer,
                resets_in_secs: rate.resets_in.num_seconds(),
            });
        }

        debug!(
            request_id = %request.id,
            from = %request.from_layer,
            to = %request.to_layer,
            action = %request.action,
            "request authenticated"
        );
        Ok(())
    }

    /// Issue a scoped session token; `None` when the scope exceeds what the
    /// matrix allows for the pair.
    pub fn issue_session_token(
        &self,
        from: Layer,
        to: Layer,
        scope: &[&str],
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Option<SessionToken> {
        self.sessions.issue(from, to, scope, ttl, now)
    }

    /// Validate a previously issued token by id. Expiry is checked here
    /// regardless of whether the cleanup sweep has run.
    pub fn validate_session(&self, token_id: &str, now: DateTime<Utc>) -> Result<SessionToken, AuthError> {
        let token = self.sessions.validate(token_id, now)?;
        if self.containment.is_contained(token.from_layer) {
            return Err(AuthError::LayerContained(token.from_layer));
        }
        if self.containment.is_contained(token.to_layer) {
            return Err(AuthError::LayerContained(token.to_layer));
        }
        Ok(token)
    }

    /// Trip the containment wire for a layer: every session touching it is
    /// revoked and the layer fails authentication from now on.
    pub fn contain_layer(&self, layer: Layer, reason: &str, now: DateTime<Utc>) -> ContainmentEvent {
        let revoked = self.sessions.revoke_for_layer(layer);
        self.containment.contain(layer, reason, revoked, now)
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn containment(&self) -> &BlastRadiusContainment {
        &self.containment
    }
}
