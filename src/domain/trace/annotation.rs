//! Trace annotations

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::geo::LocationSample;

/// Annotation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    Comment,
    MapPin,
    Star,
    Flag,
    Alert,
}

impl AnnotationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::MapPin => "map-pin",
            Self::Star => "star",
            Self::Flag => "flag",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(Self::Comment),
            "map-pin" => Ok(Self::MapPin),
            "star" => Ok(Self::Star),
            "flag" => Ok(Self::Flag),
            "alert" => Ok(Self::Alert),
            other => Err(format!("unknown annotation kind: {other}")),
        }
    }
}

/// A timestamped marker on a trace.
///
/// `location` is a point-in-time copy of the last accepted sample when the
/// annotation was created, never a live reference: later samples must not
/// change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: Uuid,
    pub timestamp_ms: u64,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Opaque blob reference for an attached image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSample>,
}

impl Annotation {
    /// Create an annotation with a fresh id.
    pub fn new(
        kind: AnnotationKind,
        timestamp_ms: u64,
        text: Option<String>,
        location: Option<LocationSample>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms,
            kind,
            text,
            image: None,
            location,
        }
    }

    /// Attach an image blob reference.
    pub fn with_image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::RawFix;

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&AnnotationKind::MapPin).unwrap();
        assert_eq!(json, "\"map-pin\"");
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("star".parse::<AnnotationKind>().unwrap(), AnnotationKind::Star);
        assert!("bogus".parse::<AnnotationKind>().is_err());
    }

    #[test]
    fn annotation_serializes_kind_under_type_key() {
        let ann = Annotation::new(AnnotationKind::Comment, 5000, Some("hi".into()), None);
        let json = serde_json::to_value(&ann).unwrap();
        assert_eq!(json["type"], "comment");
        assert_eq!(json["timestampMs"], 5000);
    }

    #[test]
    fn location_snapshot_is_a_copy() {
        let sample = LocationSample::from_fix(&RawFix::at(40.0, -73.9), 1000);
        let ann = Annotation::new(AnnotationKind::Flag, 1500, None, Some(sample));
        // Mutating nothing here; just assert the snapshot round-trips intact
        let json = serde_json::to_value(&ann).unwrap();
        let back: Annotation = serde_json::from_value(json).unwrap();
        assert_eq!(back.location, Some(sample));
    }
}
