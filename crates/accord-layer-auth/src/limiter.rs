//! Fixed-window rate limiting for layer pairs.
//!
//! Counters are keyed `"from->to"`. A new window resets the counter; there
//! is no sliding. Being limited is a soft failure that reports the time
//! until the window resets.

use std::collections::HashMap;

use accord_types::Layer;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    pub window: Duration,
    pub default_limit: u32,
    /// Per-pair overrides of the default limit.
    pub pair_limits: HashMap<(Layer, Layer), u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        let mut pair_limits = HashMap::new();
        // Chatty telemetry path gets more headroom; escalation paths less.
        pair_limits.insert((Layer::Runtime, Layer::Observer), 1000);
        pair_limits.insert((Layer::Autonomy, Layer::Council), 10);
        pair_limits.insert((Layer::Council, Layer::Human), 10);
        Self {
            window: Duration::seconds(60),
            default_limit: 100,
            pair_limits,
        }
    }
}

/// Outcome of one rate check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub resets_in: Duration,
}

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

pub struct LayerRateLimiter {
    config: RateLimiterConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl LayerRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, from: Layer, to: Layer) -> u32 {
        self.config
            .pair_limits
            .get(&(from, to))
            .copied()
            .unwrap_or(self.config.default_limit)
    }

    /// Count one call attempt against the pair's current window.
    pub fn check(&self, from: Layer, to: Layer, now: DateTime<Utc>) -> RateDecision {
        let limit = self.limit_for(from, to);
        let key = format!("{from}->{to}");
        let mut windows = self.windows.lock();
        let window = windows.entry(key.clone()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - window.started_at >= self.config.window {
            window.started_at = now;
            window.count = 0;
        }

        let resets_in = self.config.window - (now - window.started_at);
        if window.count >= limit {
            warn!(pair = %key, limit, "rate limit exceeded");
            return RateDecision {
                allowed: false,
                remaining: 0,
                resets_in,
            };
        }

        window.count += 1;
        RateDecision {
            allowed: true,
            remaining: limit - window.count,
            resets_in,
        }
    }
}
