//! PCM encoders for finished audio assets
//!
//! WAV is the default: cheap to write and seekable on playback. FLAC is
//! available where asset size matters (lossless, roughly 40% of WAV).
//! Both take mono i16 samples at the device rate; no resampling happens
//! anywhere in the pipeline.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::domain::trace::AudioMimeType;

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Number of channels (mono)
const CHANNELS: usize = 1;

/// Encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Encoder config error: {0}")]
    Config(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Encoded write failed: {0}")]
    Write(String),
}

/// Selectable asset encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetEncoder {
    #[default]
    Wav,
    Flac,
}

impl AssetEncoder {
    /// Parse an encoder name from config; unknown names fall back to WAV.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "flac" => Self::Flac,
            _ => Self::Wav,
        }
    }

    pub const fn mime_type(&self) -> AudioMimeType {
        match self {
            Self::Wav => AudioMimeType::Wav,
            Self::Flac => AudioMimeType::Flac,
        }
    }

    /// Encode mono i16 PCM at `sample_rate` into the container format.
    pub fn encode(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
        match self {
            Self::Wav => encode_to_wav(samples, sample_rate),
            Self::Flac => encode_to_flac(samples, sample_rate),
        }
    }
}

/// Encode PCM samples into a WAV container.
pub fn encode_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    let spec = WavSpec {
        channels: CHANNELS as u16,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE as u16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).map_err(|e| EncodingError::Config(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| EncodingError::Encode(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Encode PCM samples to FLAC format
pub fn encode_to_flac(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    use flacenc::bitsink::ByteSink;
    use flacenc::component::BitRepr;
    use flacenc::config;
    use flacenc::error::Verify;
    use flacenc::source::MemSource;

    // flacenc works on i32 samples internally
    let samples_i32: Vec<i32> = samples.iter().map(|&s| s as i32).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples_i32,
        CHANNELS,
        BITS_PER_SAMPLE,
        sample_rate as usize,
    );

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}
