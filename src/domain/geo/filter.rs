//! Geo filter: decides whether an incoming raw fix is worth keeping
//!
//! GPS fixes arrive at irregular rates with jitter on the order of several
//! meters; storing every fix wastes memory and produces visually noisy
//! paths. The filter is greedy and stateless except for the last accepted
//! point: it never revises a past decision.

use super::location::{planar_distance_m, LocationSample, RawFix};

/// Minimum movement in meters before a new fix is recorded.
pub const DEFAULT_MIN_MOVEMENT_M: f64 = 4.0;

/// Accuracy radius above which a fix is considered low-confidence.
const LOW_CONFIDENCE_ACCURACY_M: f64 = 20.0;

/// Distance below which a low-confidence fix is treated as stationary jitter.
const STATIONARY_JITTER_M: f64 = 10.0;

/// Signal-quality filter over a stream of raw fixes.
#[derive(Debug, Clone, Copy)]
pub struct GeoFilter {
    min_movement_m: f64,
}

impl GeoFilter {
    pub fn new() -> Self {
        Self {
            min_movement_m: DEFAULT_MIN_MOVEMENT_M,
        }
    }

    /// Override the minimum-movement threshold (config-driven).
    pub fn with_min_movement(min_movement_m: f64) -> Self {
        Self { min_movement_m }
    }

    /// Decide whether `candidate` should be kept, given the last accepted
    /// sample. Rules apply in order, short-circuiting on the first match:
    ///
    /// 1. No previous sample: accept (first fix).
    /// 2. Accuracy radius > 20 m and moved < 10 m: reject (stationary jitter).
    /// 3. Moved less than the minimum-movement threshold: reject.
    /// 4. Otherwise accept.
    pub fn accept(&self, candidate: &RawFix, last: Option<&LocationSample>) -> bool {
        let Some(last) = last else {
            return true;
        };

        let distance = planar_distance_m(candidate.lat, candidate.lng, last.lat, last.lng);

        if let Some(accuracy) = candidate.accuracy {
            if accuracy > LOW_CONFIDENCE_ACCURACY_M && distance < STATIONARY_JITTER_M {
                return false;
            }
        }

        distance >= self.min_movement_m
    }
}

impl Default for GeoFilter {
    fn default() -> Self {
        Self::new()
    }
}
