//! Accord Trust - scoring, decay, and tier derivation
//!
//! Trust is the first input to every routing decision. This crate is pure:
//! nothing here stores state, every function takes `now` explicitly, and
//! persistence of updates is the caller's responsibility.
//!
//! The core contract:
//! - raw scores live in [0, 1000] and are always clamped there;
//! - effective score is derived on read by applying time decay;
//! - the tier is a fixed banding of the effective score.

#![deny(unsafe_code)]

use accord_types::TrustTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum raw trust score.
pub const MAX_SCORE: u32 = 1000;

/// Days of inactivity before decay starts.
pub const GRACE_PERIOD_DAYS: i64 = 90;

/// Length of the decay window after the grace period; the base linear
/// percentage reaches 100% at the end of it.
pub const FULL_DECAY_DAYS: i64 = 365;

/// Decay accelerates after this many days into the decay window.
pub const ACCEL_STAGE_ONE_DAYS: i64 = 180;

/// Second acceleration threshold; both multipliers compound past it.
pub const ACCEL_STAGE_TWO_DAYS: i64 = 270;

/// Decay never erodes more than half the raw score.
pub const DECAY_FLOOR_RATIO: f64 = 0.5;

/// The stored trust state for one entity. Everything else is derived.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustRecord {
    pub entity_id: String,
    pub raw_score: u32,
    pub last_activity_at: DateTime<Utc>,
}

impl TrustRecord {
    pub fn new(entity_id: impl Into<String>, raw_score: u32, last_activity_at: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            raw_score: raw_score.min(MAX_SCORE),
            last_activity_at,
        }
    }
}

/// Result of applying time decay to a raw score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustDecay {
    pub effective_score: u32,
    pub decay_percent: f64,
    pub days_inactive: i64,
    pub in_grace_period: bool,
}

/// Result of a signed trust delta. Persisting it is the caller's job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustUpdate {
    pub entity_id: String,
    pub previous_score: u32,
    pub new_score: u32,
    pub delta: i64,
    pub reason: String,
    pub source: String,
    pub applied_at: DateTime<Utc>,
}

/// Decayed score plus the derived tier, bundled for gate consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub entity_id: String,
    pub raw_score: u32,
    pub decay: TrustDecay,
    pub tier: TrustTier,
}

/// How an agent came to exist; seeds the initial score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Fresh,
    Cloned,
    Evolved,
    Promoted,
    Imported,
}

impl Provenance {
    fn modifier(&self) -> i64 {
        match self {
            Provenance::Fresh => 0,
            Provenance::Cloned => -50,
            Provenance::Evolved => 100,
            Provenance::Promoted => 150,
            Provenance::Imported => -100,
        }
    }
}

/// Derive the tier from an effective (post-decay) score.
pub fn tier_of(effective_score: u32) -> TrustTier {
    match effective_score {
        s if s >= 900 => TrustTier::Certified,
        s if s >= 800 => TrustTier::Verified,
        s if s >= 600 => TrustTier::Trusted,
        s if s >= 400 => TrustTier::Established,
        s if s >= 200 => TrustTier::Provisional,
        _ => TrustTier::Untrusted,
    }
}

/// `true` when the held tier satisfies the required one.
pub fn tier_meets_requirement(have: TrustTier, need: TrustTier) -> bool {
    have >= need
}

/// Apply time decay to a raw score.
///
/// No decay inside the 90-day grace period. Past it, the base percentage
/// grows linearly toward 100% over a 365-day window, multiplied by 1.5 after
/// 180 days of the window and by a further 2.0 after 270 (the multipliers
/// compound), capped at 100%. The decayed score never drops below half the
/// raw score.
pub fn decay(raw_score: u32, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> TrustDecay {
    let raw_score = raw_score.min(MAX_SCORE);
    let days_inactive = (now - last_activity).num_days().max(0);

    if days_inactive <= GRACE_PERIOD_DAYS {
        return TrustDecay {
            effective_score: raw_score,
            decay_percent: 0.0,
            days_inactive,
            in_grace_period: true,
        };
    }

    let decay_days = days_inactive - GRACE_PERIOD_DAYS;
    let base_percent = (decay_days as f64 / FULL_DECAY_DAYS as f64) * 100.0;

    let mut multiplier = 1.0;
    if decay_days > ACCEL_STAGE_ONE_DAYS {
        multiplier *= 1.5;
    }
    if decay_days > ACCEL_STAGE_TWO_DAYS {
        multiplier *= 2.0;
    }

    let decay_percent = (base_percent * multiplier).min(100.0);

    let decayed = raw_score as f64 * (1.0 - decay_percent / 100.0);
    let floor = raw_score as f64 * DECAY_FLOOR_RATIO;
    let effective_score = decayed.max(floor).round() as u32;

    TrustDecay {
        effective_score,
        decay_percent,
        days_inactive,
        in_grace_period: false,
    }
}

/// Decay a record and derive its tier in one step.
pub fn snapshot(record: &TrustRecord, now: DateTime<Utc>) -> TrustSnapshot {
    let d = decay(record.raw_score, record.last_activity_at, now);
    TrustSnapshot {
        entity_id: record.entity_id.clone(),
        raw_score: record.raw_score,
        tier: tier_of(d.effective_score),
        decay: d,
    }
}

/// Apply a signed delta to the raw score, clamped to [0, 1000].
pub fn apply_trust_change(
    record: &TrustRecord,
    delta: i64,
    reason: impl Into<String>,
    source: impl Into<String>,
    now: DateTime<Utc>,
) -> TrustUpdate {
    let previous = record.raw_score.min(MAX_SCORE);
    let new_score = clamp_score(previous as i64 + delta);

    TrustUpdate {
        entity_id: record.entity_id.clone(),
        previous_score: previous,
        new_score,
        delta,
        reason: reason.into(),
        source: source.into(),
        applied_at: now,
    }
}

/// Initial score for a newly registered agent, seeded by provenance.
pub fn initial_score(base: u32, provenance: Provenance) -> u32 {
    clamp_score(base.min(MAX_SCORE) as i64 + provenance.modifier())
}

fn clamp_score(value: i64) -> u32 {
    value.clamp(0, MAX_SCORE as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn tier_bands_match_thresholds() {
        assert_eq!(tier_of(0), TrustTier::Untrusted);
        assert_eq!(tier_of(199), TrustTier::Untrusted);
        assert_eq!(tier_of(200), TrustTier::Provisional);
        assert_eq!(tier_of(400), TrustTier::Established);
        assert_eq!(tier_of(600), TrustTier::Trusted);
        assert_eq!(tier_of(800), TrustTier::Verified);
        assert_eq!(tier_of(899), TrustTier::Verified);
        assert_eq!(tier_of(900), TrustTier::Certified);
        assert_eq!(tier_of(1000), TrustTier::Certified);
    }

    #[test]
    fn no_decay_at_day_zero() {
        let now = t0();
        let d = decay(750, now, now);
        assert_eq!(d.effective_score, 750);
        assert_eq!(d.decay_percent, 0.0);
        assert!(d.in_grace_period);
    }

    #[test]
    fn no_decay_within_grace_period() {
        let now = t0();
        let d = decay(750, now - Duration::days(90), now);
        assert_eq!(d.effective_score, 750);
        assert!(d.in_grace_period);
    }

    #[test]
    fn linear_decay_after_grace() {
        let now = t0();
        // 90 grace + 73 decay days = 20% base, no acceleration yet.
        let d = decay(1000, now - Duration::days(163), now);
        assert!(!d.in_grace_period);
        assert!((d.decay_percent - 20.0).abs() < 0.01);
        assert_eq!(d.effective_score, 800);
    }

    #[test]
    fn acceleration_kicks_in_after_180_decay_days() {
        let now = t0();
        // 200 decay days: base 54.79%, x1.5 = 82.19%, floored at 50% of raw.
        let d = decay(1000, now - Duration::days(290), now);
        assert!(d.decay_percent > 80.0);
        assert_eq!(d.effective_score, 500);
    }

    #[test]
    fn decay_never_exceeds_half_of_raw() {
        let now = t0();
        let d = decay(840, now - Duration::days(3000), now);
        assert_eq!(d.effective_score, 420);
    }

    #[test]
    fn future_activity_is_treated_as_current() {
        let now = t0();
        let d = decay(500, now + Duration::days(5), now);
        assert_eq!(d.days_inactive, 0);
        assert_eq!(d.effective_score, 500);
    }

    #[test]
    fn apply_change_clamps_both_ends() {
        let now = t0();
        let record = TrustRecord::new("agent-1", 950, now);
        let up = apply_trust_change(&record, 200, "task success", "observer", now);
        assert_eq!(up.new_score, 1000);

        let record = TrustRecord::new("agent-1", 30, now);
        let down = apply_trust_change(&record, -200, "policy violation", "council", now);
        assert_eq!(down.new_score, 0);
        assert_eq!(down.previous_score, 30);
        assert_eq!(down.delta, -200);
    }

    #[test]
    fn provenance_modifiers_seed_initial_score() {
        assert_eq!(initial_score(100, Provenance::Fresh), 100);
        assert_eq!(initial_score(100, Provenance::Cloned), 50);
        assert_eq!(initial_score(100, Provenance::Evolved), 200);
        assert_eq!(initial_score(100, Provenance::Promoted), 250);
        assert_eq!(initial_score(50, Provenance::Imported), 0);
    }

    #[test]
    fn snapshot_derives_tier_from_decayed_score() {
        let now = t0();
        // 850 raw, decayed past the floor -> 425 -> established.
        let record = TrustRecord::new("agent-1", 850, now - Duration::days(2000));
        let snap = snapshot(&record, now);
        assert_eq!(snap.decay.effective_score, 425);
        assert_eq!(snap.tier, TrustTier::Established);
    }

    proptest! {
        #[test]
        fn tier_is_monotonic_in_score(a in 0u32..=1000, b in 0u32..=1000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tier_of(lo) <= tier_of(hi));
        }

        #[test]
        fn decay_respects_floor(raw in 0u32..=1000, days in 0i64..5000) {
            let now = t0();
            let d = decay(raw, now - Duration::days(days), now);
            prop_assert!(d.effective_score >= raw / 2);
            prop_assert!(d.effective_score <= raw);
        }

        #[test]
        fn apply_change_stays_in_bounds(score in 0u32..=1000, delta in -2000i64..2000) {
            let record = TrustRecord::new("p", score, t0());
            let up = apply_trust_change(&record, delta, "prop", "prop", t0());
            prop_assert!(up.new_score <= 1000);
        }
    }
}
