use serde::{Deserialize, Serialize};

use super::{haversine_m, GeoFix};

/// Running distance total built from consecutive fix pairs.
///
/// Only the most recent fix is retained. The first fix seeds `last_fix` and
/// contributes nothing; every later fix adds exactly one non-negative delta.
/// Jitter from a stationary receiver is accepted verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistanceAccumulator {
    last_fix: Option<GeoFix>,
    total_m: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next fix. Returns the delta added, or `None` when the fix only
    /// seeded the accumulator or was discarded as invalid.
    pub fn push(&mut self, fix: GeoFix) -> Option<f64> {
        if !fix.is_valid() {
            return None;
        }
        let prev = self.last_fix.replace(fix)?;

        let delta = haversine_m(&prev, &fix);
        if !delta.is_finite() || delta < 0.0 {
            self.last_fix = Some(prev);
            return None;
        }
        self.total_m += delta;
        Some(delta)
    }

    pub fn total_m(&self) -> f64 {
        self.total_m
    }

    pub fn last_fix(&self) -> Option<&GeoFix> {
        self.last_fix.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_fix_only_seeds() {
        let mut acc = DistanceAccumulator::new();
        assert_eq!(acc.push(GeoFix::new(0.0, 0.0, 0)), None);
        assert_eq!(acc.total_m(), 0.0);
        assert!(acc.last_fix().is_some());
    }

    #[test]
    fn two_steps_sum() {
        let mut acc = DistanceAccumulator::new();
        acc.push(GeoFix::new(0.0, 0.0, 0));
        let d1 = acc.push(GeoFix::new(0.0, 0.001, 1_000)).unwrap();
        let d2 = acc.push(GeoFix::new(0.0, 0.002, 2_000)).unwrap();
        assert!((d1 - 111.19).abs() < 0.5);
        assert!((acc.total_m() - (d1 + d2)).abs() < 1e-9);
        assert!((acc.total_m() - 222.39).abs() < 1.0);
    }

    #[test]
    fn invalid_fix_leaves_state_untouched() {
        let mut acc = DistanceAccumulator::new();
        acc.push(GeoFix::new(10.0, 10.0, 0));
        assert_eq!(acc.push(GeoFix::new(f64::NAN, 10.0, 1)), None);
        assert_eq!(acc.last_fix().map(|f| f.captured_at_ms), Some(0));
        assert_eq!(acc.total_m(), 0.0);
    }

    fn fix_strategy() -> impl Strategy<Value = GeoFix> {
        (-89.0f64..89.0, -179.0f64..179.0, 0u64..10_000_000)
            .prop_map(|(lat, lon, t)| GeoFix::new(lat, lon, t))
    }

    proptest! {
        #[test]
        fn total_never_decreases(fixes in proptest::collection::vec(fix_strategy(), 0..64)) {
            let mut acc = DistanceAccumulator::new();
            let mut previous = 0.0;
            for fix in fixes {
                if let Some(delta) = acc.push(fix) {
                    prop_assert!(delta >= 0.0);
                }
                prop_assert!(acc.total_m() >= previous);
                previous = acc.total_m();
            }
        }
    }
}
