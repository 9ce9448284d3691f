//! Audio capture, encoding and playback adapters

pub mod cpal_input;
pub mod encoder;
pub mod rodio_output;

pub use cpal_input::CpalMicrophone;
pub use encoder::AssetEncoder;
pub use rodio_output::RodioAudioOutput;
