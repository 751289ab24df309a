//! Forgetting curve and repeat-observation blending.
//!
//! Both are pure functions behind `FrequencyPolicy` so a dictionary can be
//! configured with another curve without touching the write path.

use crate::settings::{Settings, MAX_FREQUENCY};

pub trait FrequencyPolicy: Send + Sync {
    /// Frequency of an entry last touched at `last_touched`, observed at
    /// `now`. Must be non-increasing in `now` and never exceed `frequency`.
    fn decay(&self, frequency: u8, last_touched: Option<u64>, now: u64) -> u8;

    /// Combine the (already decayed) old frequency with a new observation.
    /// Must be at least `observed` and at most `MAX_FREQUENCY`.
    fn blend(&self, old: u8, observed: u8) -> u8;
}

/// Hyperbolic decay `1 / (1 + hours / half_life)` with retention-weighted
/// blending.
#[derive(Debug, Clone, Copy)]
pub struct ForgettingCurve {
    half_life_hours: f64,
    retention: f64,
}

impl ForgettingCurve {
    pub fn new(half_life_hours: f64, retention: f64) -> Self {
        Self {
            half_life_hours,
            retention: retention.clamp(0.0, 1.0),
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(s.forgetting.half_life_hours, s.frequency.retention)
    }
}

/// Multiplier in (0, 1]. Timestamps in the future count as "just now".
pub fn decay_factor(last_touched: u64, now: u64, half_life_hours: f64) -> f64 {
    let hours = now.saturating_sub(last_touched) as f64 / 3600.0;
    1.0 / (1.0 + hours / half_life_hours)
}

impl FrequencyPolicy for ForgettingCurve {
    fn decay(&self, frequency: u8, last_touched: Option<u64>, now: u64) -> u8 {
        let Some(last) = last_touched else {
            return frequency;
        };
        let decayed = (frequency as f64 * decay_factor(last, now, self.half_life_hours)).floor();
        decayed.clamp(0.0, frequency as f64) as u8
    }

    fn blend(&self, old: u8, observed: u8) -> u8 {
        let kept = (old as f64 * self.retention).floor() as u16;
        (observed as u16 + kept).min(MAX_FREQUENCY as u16) as u8
    }
}

/// Frequency as readers of a store see it: decayed only when the store's
/// header enables the forgetting curve.
pub fn effective_frequency(
    policy: &dyn FrequencyPolicy,
    uses_forgetting_curve: bool,
    frequency: u8,
    last_touched: Option<u64>,
    now: u64,
) -> u8 {
    if uses_forgetting_curve {
        policy.decay(frequency, last_touched, now)
    } else {
        frequency
    }
}
