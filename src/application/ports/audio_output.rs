//! Audio output (playback) port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::trace::AudioAsset;

/// Audio output errors
#[derive(Debug, Clone, Error)]
pub enum AudioOutputError {
    #[error("Failed to open audio output: {0}")]
    OpenFailed(String),

    #[error("Failed to decode audio asset: {0}")]
    DecodeFailed(String),

    #[error("Seek not supported by this asset: {0}")]
    SeekFailed(String),

    #[error("No audio asset loaded")]
    NotLoaded,
}

/// Port for audio playback of a finished asset.
///
/// Position is a floating-point seconds value — the playback clock that the
/// controller's sync loop reads every frame.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Load an asset, leaving playback paused at position 0.
    async fn load(&self, asset: &AudioAsset) -> Result<(), AudioOutputError>;

    fn play(&self) -> Result<(), AudioOutputError>;

    fn pause(&self) -> Result<(), AudioOutputError>;

    /// Seek to an absolute position in seconds.
    fn seek(&self, position_sec: f64) -> Result<(), AudioOutputError>;

    /// Current playback position in seconds.
    fn position_sec(&self) -> f64;

    /// Whether the loaded asset has played to its end.
    fn is_finished(&self) -> bool;
}
