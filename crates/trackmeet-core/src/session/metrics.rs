//! Derived session metrics.
//!
//! Every value is recomputed from canonical state on each tick. A late or
//! skipped tick therefore cannot accumulate error.

use serde::{Deserialize, Serialize};

pub const FULL_STAMINA: f64 = 100.0;

/// Inputs the aggregator reads. Everything else is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalState {
    pub distance_m: f64,
    pub started_at_ms: u64,
    pub now_ms: u64,
    /// Active ticks processed so far.
    pub decay_ticks: u64,
    pub decay_per_tick: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub elapsed_seconds: u64,
    pub distance_meters: f64,
    pub average_speed_kmh: f64,
    pub pace_min_per_km: f64,
    pub stamina_percent: f64,
}

impl LiveMetrics {
    /// Metrics of a session that has just become active.
    pub fn initial() -> Self {
        Self {
            stamina_percent: FULL_STAMINA,
            ..Self::default()
        }
    }
}

pub fn compute(state: &CanonicalState) -> LiveMetrics {
    let elapsed_seconds = elapsed_seconds(state.started_at_ms, state.now_ms);
    let distance_m = if state.distance_m.is_finite() {
        state.distance_m.max(0.0)
    } else {
        0.0
    };

    LiveMetrics {
        elapsed_seconds,
        distance_meters: distance_m,
        average_speed_kmh: average_speed_kmh(distance_m, elapsed_seconds),
        pace_min_per_km: pace_min_per_km(distance_m, elapsed_seconds),
        stamina_percent: stamina_percent(state.decay_ticks, state.decay_per_tick),
    }
}

/// Whole seconds since `started_at_ms`; zero if the clock reads earlier.
pub fn elapsed_seconds(started_at_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(started_at_ms) / 1000
}

/// km/h, or 0 before the first whole second.
pub fn average_speed_kmh(distance_m: f64, elapsed_seconds: u64) -> f64 {
    if elapsed_seconds == 0 {
        return 0.0;
    }
    (distance_m / 1000.0) / (elapsed_seconds as f64 / 3600.0)
}

/// min/km, or 0 with no distance covered.
pub fn pace_min_per_km(distance_m: f64, elapsed_seconds: u64) -> f64 {
    if distance_m <= 0.0 {
        return 0.0;
    }
    (elapsed_seconds as f64 / 60.0) / (distance_m / 1000.0)
}

pub fn stamina_percent(decay_ticks: u64, decay_per_tick: f64) -> f64 {
    let decay = decay_ticks as f64 * decay_per_tick.max(0.0);
    (FULL_STAMINA - decay).clamp(0.0, FULL_STAMINA)
}
