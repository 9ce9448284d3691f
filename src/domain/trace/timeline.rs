//! Timeline index: playback-time to location/annotation resolution
//!
//! The contract is linear-scan semantics: the first sample whose timestamp
//! is at or after the query time, falling back to the last sample when the
//! query is past the end. `TimelineCursor` is an optimization over the same
//! contract for monotonically advancing playback; its answers must be
//! identical to `location_at`.

use super::annotation::Annotation;
use super::trace::Trace;
use crate::domain::geo::{planar_distance_m, LocationSample};

/// Resolve the location displayed at `time_ms`.
///
/// Returns the first sample with `timestamp_ms >= time_ms`; if the query is
/// past the last sample, the last sample. `None` only for an empty trace.
pub fn location_at(trace: &Trace, time_ms: u64) -> Option<&LocationSample> {
    let locations = &trace.locations;
    let idx = locations.partition_point(|l| l.timestamp_ms < time_ms);
    locations.get(idx).or_else(|| locations.last())
}

/// The sample closest to `point` under the planar approximation.
///
/// Used to seek playback by picking a point on the path.
pub fn nearest_location_to(trace: &Trace, lat: f64, lng: f64) -> Option<&LocationSample> {
    trace
        .locations
        .iter()
        .min_by(|a, b| {
            let da = planar_distance_m(a.lat, a.lng, lat, lng);
            let db = planar_distance_m(b.lat, b.lng, lat, lng);
            da.total_cmp(&db)
        })
}

/// Annotations whose timestamp falls within `window_ms` of `time_ms`,
/// ordered by timestamp.
///
/// Annotations are stored in creation order; this is the sort-at-query-time
/// side of that contract.
pub fn annotations_near(trace: &Trace, time_ms: u64, window_ms: u64) -> Vec<&Annotation> {
    let mut hits: Vec<&Annotation> = trace
        .annotations
        .iter()
        .filter(|a| a.timestamp_ms.abs_diff(time_ms) <= window_ms)
        .collect();
    hits.sort_by_key(|a| a.timestamp_ms);
    hits
}

/// Cached cursor for forward playback.
///
/// Exploits two facts: the sample sequence is sorted, and queries during
/// forward playback are monotonically increasing. A backward query resets
/// to a binary search.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimelineCursor {
    index: usize,
    last_query_ms: u64,
}

impl TimelineCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the location at `time_ms`, advancing the cached position.
    pub fn location_at<'t>(
        &mut self,
        trace: &'t Trace,
        time_ms: u64,
    ) -> Option<&'t LocationSample> {
        let locations = &trace.locations;
        if locations.is_empty() {
            return None;
        }

        if time_ms < self.last_query_ms {
            // Backward seek: rebuild the cursor position
            self.index = locations.partition_point(|l| l.timestamp_ms < time_ms);
        } else {
            while self.index < locations.len() && locations[self.index].timestamp_ms < time_ms {
                self.index += 1;
            }
        }
        self.last_query_ms = time_ms;

        locations.get(self.index).or_else(|| locations.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::RawFix;
    use crate::domain::trace::AnnotationKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample(ts: u64, lat: f64, lng: f64) -> LocationSample {
        LocationSample::from_fix(&RawFix::at(lat, lng), ts)
    }

    fn trace_with(locations: Vec<LocationSample>) -> Trace {
        Trace {
            id: Uuid::new_v4(),
            start_time: Utc::now(),
            duration_sec: 60,
            locations,
            annotations: vec![],
            audio: None,
            created_at: Utc::now(),
            transcription: None,
        }
    }

    fn three_sample_trace() -> Trace {
        trace_with(vec![
            sample(0, 40.0, -73.9),
            sample(5000, 40.001, -73.9),
            sample(12000, 40.002, -73.9),
        ])
    }

    #[test]
    fn query_between_samples_returns_next() {
        let trace = three_sample_trace();
        assert_eq!(location_at(&trace, 7000).unwrap().timestamp_ms, 12000);
    }

    #[test]
    fn query_at_exact_timestamp_returns_that_sample() {
        let trace = three_sample_trace();
        assert_eq!(location_at(&trace, 12000).unwrap().timestamp_ms, 12000);
        assert_eq!(location_at(&trace, 5000).unwrap().timestamp_ms, 5000);
        assert_eq!(location_at(&trace, 0).unwrap().timestamp_ms, 0);
    }

    #[test]
    fn query_past_end_returns_last() {
        let trace = three_sample_trace();
        assert_eq!(location_at(&trace, 99999).unwrap().timestamp_ms, 12000);
    }

    #[test]
    fn query_before_first_returns_first() {
        let trace = trace_with(vec![sample(3000, 40.0, -73.9), sample(8000, 40.001, -73.9)]);
        assert_eq!(location_at(&trace, 0).unwrap().timestamp_ms, 3000);
    }

    #[test]
    fn empty_trace_returns_none() {
        let trace = trace_with(vec![]);
        assert!(location_at(&trace, 0).is_none());
    }

    #[test]
    fn cursor_matches_linear_scan_forward_and_backward() {
        let trace = three_sample_trace();
        let mut cursor = TimelineCursor::new();
        for t in [0, 100, 4999, 5000, 7000, 12000, 99999, 6000, 0] {
            let expected = location_at(&trace, t).map(|l| l.timestamp_ms);
            let got = cursor.location_at(&trace, t).map(|l| l.timestamp_ms);
            assert_eq!(got, expected, "cursor diverged at t={t}");
        }
    }

    #[test]
    fn nearest_location_picks_minimum_planar_distance() {
        let trace = three_sample_trace();
        let nearest = nearest_location_to(&trace, 40.0011, -73.9).unwrap();
        assert_eq!(nearest.timestamp_ms, 5000);
    }

    #[test]
    fn nearest_location_on_empty_trace_is_none() {
        let trace = trace_with(vec![]);
        assert!(nearest_location_to(&trace, 40.0, -73.9).is_none());
    }

    #[test]
    fn annotations_near_filters_and_orders() {
        let mut trace = three_sample_trace();
        trace.push_annotation(Annotation::new(AnnotationKind::Star, 9000, None, None));
        trace.push_annotation(Annotation::new(AnnotationKind::Comment, 6000, None, None));
        trace.push_annotation(Annotation::new(AnnotationKind::Flag, 20000, None, None));

        let hits = annotations_near(&trace, 7000, 2000);
        let stamps: Vec<u64> = hits.iter().map(|a| a.timestamp_ms).collect();
        // Sorted by timestamp even though stored in creation order
        assert_eq!(stamps, vec![6000, 9000]);
    }

    #[test]
    fn annotations_near_window_is_inclusive() {
        let mut trace = three_sample_trace();
        trace.push_annotation(Annotation::new(AnnotationKind::Alert, 9000, None, None));
        assert_eq!(annotations_near(&trace, 7000, 2000).len(), 1);
        assert_eq!(annotations_near(&trace, 7000, 1999).len(), 0);
    }
}
