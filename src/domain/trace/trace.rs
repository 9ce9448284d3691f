//! The trace entity: one complete recording

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::annotation::Annotation;
use super::audio::AudioAsset;
use crate::domain::geo::LocationSample;

/// A chunk of transcribed speech with its time range in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptChunk {
    pub text: String,
    /// [start, end] in playback seconds.
    pub time_range_sec: [f64; 2],
}

/// Transcription result attached to a trace after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub chunks: Vec<TranscriptChunk>,
}

/// One complete recording: audio plus time-correlated location and
/// annotation data.
///
/// Invariants: `locations` is ordered by `timestamp_ms`; `duration_sec`
/// reflects effective (unpaused) recording time, not wall-clock elapsed
/// time. Once a capture session stops, the trace is immutable apart from
/// post-hoc annotations and transcription attachment, both persisted as a
/// whole-trace write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub id: Uuid,
    /// Wall-clock anchor of the recording start.
    pub start_time: DateTime<Utc>,
    pub duration_sec: u64,
    pub locations: Vec<LocationSample>,
    pub annotations: Vec<Annotation>,
    pub audio: Option<AudioAsset>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<Transcription>,
}

impl Trace {
    /// The last recorded sample, if any.
    pub fn last_location(&self) -> Option<&LocationSample> {
        self.locations.last()
    }

    /// Append a post-hoc annotation. Appended at the end; ordering is
    /// applied at query time, not here.
    pub fn push_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_sec * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::RawFix;
    use crate::domain::trace::AnnotationKind;

    fn sample(ts: u64) -> LocationSample {
        LocationSample::from_fix(&RawFix::at(40.0, -73.9), ts)
    }

    fn trace_fixture() -> Trace {
        Trace {
            id: Uuid::new_v4(),
            start_time: Utc::now(),
            duration_sec: 120,
            locations: vec![sample(0), sample(5000), sample(12000)],
            annotations: vec![],
            audio: None,
            created_at: Utc::now(),
            transcription: None,
        }
    }

    #[test]
    fn serde_round_trip_preserves_field_names() {
        let trace = trace_fixture();
        let json = serde_json::to_value(&trace).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("durationSec").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["locations"][1]["timestampMs"], 5000);
        let back: Trace = serde_json::from_value(json).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn push_annotation_appends() {
        let mut trace = trace_fixture();
        trace.push_annotation(Annotation::new(AnnotationKind::Star, 9000, None, None));
        trace.push_annotation(Annotation::new(AnnotationKind::Flag, 3000, None, None));
        // Append order kept; not re-sorted by timestamp
        assert_eq!(trace.annotations[0].timestamp_ms, 9000);
        assert_eq!(trace.annotations[1].timestamp_ms, 3000);
    }

    #[test]
    fn transcription_round_trips() {
        let mut trace = trace_fixture();
        trace.transcription = Some(Transcription {
            text: "out for a walk".into(),
            chunks: vec![TranscriptChunk {
                text: "out for a walk".into(),
                time_range_sec: [0.0, 2.5],
            }],
        });
        let json = serde_json::to_string(&trace).unwrap();
        let back: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transcription, trace.transcription);
    }
}
