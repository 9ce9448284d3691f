//! Location value objects

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude, also used for longitude.
///
/// Planar approximation: adequate at city scale, degrades at high latitudes
/// and over long east-west distances. This is the defined behavior for both
/// filtering and nearest-point lookup, not an accuracy bug.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A raw position report from a location sensor, prior to filtering.
///
/// Carries no trace timestamp; timestamping happens at acceptance, against
/// the session's effective clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFix {
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub altitude: Option<f64>,
    /// Reported horizontal accuracy radius in meters.
    pub accuracy: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
}

impl RawFix {
    /// A fix with only coordinates set.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            speed: None,
            altitude: None,
            accuracy: None,
            altitude_accuracy: None,
            heading: None,
        }
    }

    /// Set the reported accuracy radius.
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// An accepted, timestamped location sample.
///
/// Produced only by the geo filter's accept path; immutable once appended
/// to a trace. `timestamp_ms` is effective recording time (pauses excluded)
/// and is non-decreasing across a trace's sample sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl LocationSample {
    /// Build a sample from an accepted fix and its effective timestamp.
    pub fn from_fix(fix: &RawFix, timestamp_ms: u64) -> Self {
        Self {
            lat: fix.lat,
            lng: fix.lng,
            timestamp_ms,
            speed: fix.speed,
            altitude: fix.altitude,
            accuracy: fix.accuracy,
            altitude_accuracy: fix.altitude_accuracy,
            heading: fix.heading,
        }
    }
}

/// Approximate planar distance in meters between two coordinate pairs.
pub fn planar_distance_m(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let d_lat = lat_a - lat_b;
    let d_lng = lng_a - lng_b;
    (d_lat * d_lat + d_lng * d_lng).sqrt() * METERS_PER_DEGREE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_zero_for_same_point() {
        assert_eq!(planar_distance_m(40.0, -73.9, 40.0, -73.9), 0.0);
    }

    #[test]
    fn distance_scales_with_degrees() {
        // One millidegree of latitude is ~111 meters under the approximation
        let d = planar_distance_m(40.000, -73.9, 40.001, -73.9);
        assert!((d - 111.0).abs() < 1e-6);
    }

    #[test]
    fn sample_from_fix_copies_optionals() {
        let fix = RawFix {
            lat: 1.0,
            lng: 2.0,
            speed: Some(1.5),
            altitude: Some(30.0),
            accuracy: Some(5.0),
            altitude_accuracy: None,
            heading: Some(270.0),
        };
        let sample = LocationSample::from_fix(&fix, 1234);
        assert_eq!(sample.timestamp_ms, 1234);
        assert_eq!(sample.speed, Some(1.5));
        assert_eq!(sample.heading, Some(270.0));
        assert_eq!(sample.altitude_accuracy, None);
    }

    #[test]
    fn sample_serializes_camel_case() {
        let sample = LocationSample::from_fix(&RawFix::at(40.78, -73.96), 5000);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestampMs"], 5000);
        assert_eq!(json["lat"], 40.78);
        // Absent optionals are omitted, not null
        assert!(json.get("altitudeAccuracy").is_none());
    }
}
