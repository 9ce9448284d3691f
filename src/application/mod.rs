//! Application layer - Use cases and port interfaces
//!
//! The capture session, playback controller and publish pipeline, each a
//! struct generic over the ports it consumes. Concrete adapters are wired
//! in by the CLI layer.

pub mod capture;
pub mod playback;
pub mod ports;
pub mod publish;

// Re-export common types
pub use capture::{CaptureError, CaptureSession, CaptureSnapshot, StartOutcome};
pub use playback::{PlaybackController, PlaybackError, PlaybackSnapshot, PlaybackState};
pub use publish::{
    PublishError, PublishOptions, PublishPipeline, PublishReceipt, MAX_PUBLISH_DURATION_SEC,
};
