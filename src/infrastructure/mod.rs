//! Infrastructure layer - Adapter implementations
//!
//! Concrete implementations of the application ports: cpal microphone,
//! WAV/FLAC encoders, rodio playback, gpsd fix stream, filesystem trace
//! store, GitHub contents-API remote store, password cipher, Gemini
//! transcriber and the XDG config store.

pub mod audio;
pub mod config;
pub mod crypto;
pub mod location;
pub mod remote;
pub mod storage;
pub mod transcription;

// Re-export adapters
pub use audio::{AssetEncoder, CpalMicrophone, RodioAudioOutput};
pub use config::XdgConfigStore;
pub use crypto::PasswordCipher;
pub use location::GpsdLocationSource;
pub use remote::GithubRemoteStore;
pub use storage::FsTraceStore;
pub use transcription::GeminiTranscriber;
