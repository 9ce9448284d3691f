//! Transcription port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::trace::{AudioAsset, Transcription};

/// Transcription errors
#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Empty transcription response")]
    EmptyResponse,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Audio asset has no readable bytes")]
    NoAudioData,
}

/// Port for speech-to-text with timestamped chunks.
///
/// Consumed as an opaque request/response capability; the adapter is
/// constructed lazily by whoever wires the system and torn down with it —
/// never a process-lifetime singleton.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio asset into text plus time-ranged chunks.
    async fn transcribe(&self, audio: &AudioAsset) -> Result<Transcription, TranscriptionError>;
}
