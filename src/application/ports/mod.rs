//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod audio_input;
pub mod audio_output;
pub mod cipher;
pub mod config;
pub mod location;
pub mod remote_store;
pub mod trace_store;
pub mod transcriber;

// Re-export common types
pub use audio_input::{AudioInput, AudioInputError};
pub use audio_output::{AudioOutput, AudioOutputError};
pub use cipher::{CryptoError, PayloadCipher};
pub use config::ConfigStore;
pub use location::{LocationError, LocationSource, LocationSubscription};
pub use remote_store::{RemoteObject, RemoteStore, RemoteStoreError};
pub use trace_store::{StorageError, TraceStore};
pub use transcriber::{Transcriber, TranscriptionError};
