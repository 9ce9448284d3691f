//! Audio input port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::trace::AudioAsset;

/// Audio input errors
#[derive(Debug, Clone, Error)]
pub enum AudioInputError {
    #[error("Failed to start audio capture: {0}")]
    StartFailed(String),

    #[error("Audio capture failed: {0}")]
    CaptureFailed(String),

    #[error("Failed to encode audio: {0}")]
    EncodeFailed(String),

    #[error("No audio input device available")]
    NoAudioDevice,

    #[error("Audio capture is not running")]
    NotCapturing,
}

/// Port for open-ended microphone capture.
///
/// `stop` finalizes the stream into a complete [`AudioAsset`]. Paused time
/// is excluded from the asset entirely — pausing drops incoming frames
/// rather than recording silence, so the audio timeline matches effective
/// recording time.
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Start an unbounded capture.
    async fn start(&self) -> Result<(), AudioInputError>;

    /// Suspend capture; incoming frames are discarded until resume.
    async fn pause(&self) -> Result<(), AudioInputError>;

    /// Resume a paused capture.
    async fn resume(&self) -> Result<(), AudioInputError>;

    /// Stop capture and finalize the recorded asset.
    async fn stop(&self) -> Result<AudioAsset, AudioInputError>;

    /// Check if frames are currently being captured
    fn is_capturing(&self) -> bool;
}
