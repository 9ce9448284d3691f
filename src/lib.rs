//! Sauntercast - record, replay and publish audio + GPS walk traces
//!
//! A "saunter" is one complete recording: audio plus time-correlated
//! location and annotation data, captured against an effective clock that
//! excludes paused intervals.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Geo filter, session clock, capture lifecycle, trace data
//!   model, timeline index, published envelope
//! - **Application**: Use cases (capture, playback, publish) and port
//!   interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, rodio, gpsd,
//!   filesystem store, GitHub remote store, password cipher, Gemini)
//! - **CLI**: Command-line interface and the interactive loops

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
