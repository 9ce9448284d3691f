//! Audio asset value objects

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Supported audio MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioMimeType {
    #[serde(rename = "audio/wav")]
    Wav,
    #[serde(rename = "audio/flac")]
    Flac,
    #[serde(rename = "audio/ogg")]
    Ogg,
    #[serde(rename = "audio/mpeg")]
    Mpeg,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::Mpeg => "audio/mpeg",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Mpeg => "mp3",
        }
    }

    /// Guess the MIME type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "ogg" => Some(Self::Ogg),
            "mp3" => Some(Self::Mpeg),
            _ => None,
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for AudioMimeType {
    fn default() -> Self {
        Self::Wav
    }
}

/// The finished audio asset of a trace.
///
/// Locally the audio lives in a sidecar file next to the trace document
/// (`file`); when a trace travels — publish with audio, fetch of a remote
/// trace — the bytes are inlined base64 in `data` instead. At least one of
/// the two is set on any asset attached to a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAsset {
    pub mime_type: AudioMimeType,
    /// Local sidecar path. Never serialized into published payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Inline audio bytes, base64 in transport form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub data: Option<Vec<u8>>,
}

impl AudioAsset {
    /// An asset backed by a local file.
    pub fn from_file(file: PathBuf, mime_type: AudioMimeType) -> Self {
        Self {
            mime_type,
            file: Some(file),
            data: None,
        }
    }

    /// An asset carrying its bytes inline.
    pub fn from_bytes(data: Vec<u8>, mime_type: AudioMimeType) -> Self {
        Self {
            mime_type,
            file: None,
            data: Some(data),
        }
    }

    /// A copy with the local file reference stripped, keeping only inline
    /// data (if any). Used when building publish payloads.
    pub fn detached(&self) -> Self {
        Self {
            mime_type: self.mime_type,
            file: None,
            data: self.data.clone(),
        }
    }
}

/// Serde adapter: Option<Vec<u8>> as base64 text.
mod base64_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => ser.serialize_str(&BASE64_STANDARD.encode(bytes)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let text: Option<String> = Option::deserialize(de)?;
        match text {
            Some(s) => BASE64_STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_round_trips_through_serde() {
        let json = serde_json::to_string(&AudioMimeType::Flac).unwrap();
        assert_eq!(json, "\"audio/flac\"");
        let back: AudioMimeType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AudioMimeType::Flac);
    }

    #[test]
    fn from_extension_is_case_insensitive() {
        assert_eq!(AudioMimeType::from_extension("WAV"), Some(AudioMimeType::Wav));
        assert_eq!(AudioMimeType::from_extension("xyz"), None);
    }

    #[test]
    fn inline_data_serializes_as_base64() {
        let asset = AudioAsset::from_bytes(vec![1, 2, 3, 4], AudioMimeType::Wav);
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["data"], "AQIDBA==");
        let back: AudioAsset = serde_json::from_value(json).unwrap();
        assert_eq!(back.data, Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn detached_drops_file_reference() {
        let asset = AudioAsset::from_file(PathBuf::from("/tmp/a.wav"), AudioMimeType::Wav);
        let detached = asset.detached();
        assert!(detached.file.is_none());
        assert_eq!(detached.mime_type, AudioMimeType::Wav);
    }
}
