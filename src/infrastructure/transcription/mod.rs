//! Transcription adapters

pub mod gemini;

pub use gemini::GeminiTranscriber;
