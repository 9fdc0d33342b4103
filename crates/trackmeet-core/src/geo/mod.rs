//! Geolocation fixes, great-circle distance and the fix source seam.

mod accumulator;
mod source;

pub use accumulator::DistanceAccumulator;
pub use source::{GeoSampleSource, Permission, ReplaySource, SubscriptionHandle};

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One geolocation sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Capture time in epoch milliseconds.
    pub captured_at_ms: u64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, captured_at_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            captured_at_ms,
        }
    }

    /// Both coordinates are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance between two fixes in meters (haversine formula).
pub fn haversine_m(c1: &GeoFix, c2: &GeoFix) -> f64 {
    let d_lat = (c2.latitude - c1.latitude).to_radians();
    let d_lon = (c2.longitude - c1.longitude).to_radians();
    let lat1 = c1.latitude.to_radians();
    let lat2 = c2.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}
