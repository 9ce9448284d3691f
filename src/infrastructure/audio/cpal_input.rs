//! Microphone capture using cpal
//!
//! The stream lives on a dedicated thread because cpal::Stream is not
//! Send. Pausing does not tear the stream down: a gate flag makes the
//! data callback drop incoming frames, so paused time simply never enters
//! the buffer and the finished asset's timeline matches effective
//! recording time.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use log::warn;
use tokio::time::Duration as TokioDuration;

use super::encoder::AssetEncoder;
use crate::application::ports::{AudioInput, AudioInputError};
use crate::domain::trace::AudioAsset;

/// Microphone input with pause gating.
pub struct CpalMicrophone {
    encoder: AssetEncoder,
    /// Captured mono samples at the device rate
    buffer: Arc<StdMutex<Vec<i16>>>,
    device_sample_rate: Arc<AtomicU32>,
    /// Stream thread liveness: false tells the thread to drop the stream
    running: Arc<AtomicBool>,
    /// Frame gate: false while paused
    capturing: Arc<AtomicBool>,
}

impl CpalMicrophone {
    pub fn new(encoder: AssetEncoder) -> Self {
        Self {
            encoder,
            buffer: Arc::new(StdMutex::new(Vec::new())),
            device_sample_rate: Arc::new(AtomicU32::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn get_input_device() -> Result<cpal::Device, AudioInputError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or(AudioInputError::NoAudioDevice)
    }

    /// Pick an input config: i16 or f32 only, fewest channels wins.
    fn get_input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), AudioInputError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| AudioInputError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;
        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }
            let is_better = match &best_config {
                None => true,
                Some(current) => config.channels() < current.channels(),
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config.ok_or(AudioInputError::StartFailed(
            "No suitable input config found".into(),
        ))?;

        let sample_rate = config_range
            .max_sample_rate()
            .min(cpal::SampleRate(48_000))
            .max(config_range.min_sample_rate());
        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Mix interleaved frames down to mono
    fn to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels == 1 {
            return samples.to_vec();
        }
        samples
            .chunks(channels as usize)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }
}

#[async_trait]
impl AudioInput for CpalMicrophone {
    async fn start(&self) -> Result<(), AudioInputError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(AudioInputError::StartFailed(
                "Capture already in progress".to_string(),
            ));
        }

        self.buffer.lock().unwrap().clear();
        self.running.store(true, Ordering::SeqCst);
        self.capturing.store(true, Ordering::SeqCst);

        let buffer = Arc::clone(&self.buffer);
        let device_sample_rate = Arc::clone(&self.device_sample_rate);
        let running = Arc::clone(&self.running);
        let capturing = Arc::clone(&self.capturing);

        // The stream thread owns the cpal stream for the whole session
        std::thread::spawn(move || {
            let failed = |running: &AtomicBool| running.store(false, Ordering::SeqCst);

            let device = match CpalMicrophone::get_input_device() {
                Ok(d) => d,
                Err(_) => return failed(&running),
            };
            let (config, sample_format) = match CpalMicrophone::get_input_config(&device) {
                Ok(c) => c,
                Err(_) => return failed(&running),
            };
            let channels = config.channels;
            device_sample_rate.store(config.sample_rate.0, Ordering::SeqCst);

            let buffer_i16 = Arc::clone(&buffer);
            let gate_i16 = Arc::clone(&capturing);
            let stream_result = match sample_format {
                SampleFormat::I16 => device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if gate_i16.load(Ordering::SeqCst) {
                            let mono = CpalMicrophone::to_mono(data, channels);
                            if let Ok(mut buffer) = buffer_i16.lock() {
                                buffer.extend_from_slice(&mono);
                            }
                        }
                    },
                    |err| warn!("audio stream error: {}", err),
                    None,
                ),

                SampleFormat::F32 => {
                    let buffer_f32 = Arc::clone(&buffer);
                    let gate_f32 = Arc::clone(&capturing);
                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            if gate_f32.load(Ordering::SeqCst) {
                                let i16_data: Vec<i16> =
                                    data.iter().map(|&s| (s * 32767.0) as i16).collect();
                                let mono = CpalMicrophone::to_mono(&i16_data, channels);
                                if let Ok(mut buffer) = buffer_f32.lock() {
                                    buffer.extend_from_slice(&mono);
                                }
                            }
                        },
                        |err| warn!("audio stream error: {}", err),
                        None,
                    )
                }

                _ => return failed(&running),
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(_) => return failed(&running),
            };
            if stream.play().is_err() {
                return failed(&running);
            }

            while running.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            drop(stream);
        });

        // Give the thread a moment to acquire the device
        tokio::time::sleep(TokioDuration::from_millis(50)).await;

        if !self.running.load(Ordering::SeqCst) {
            return Err(AudioInputError::StartFailed(
                "Failed to start audio capture".into(),
            ));
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), AudioInputError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AudioInputError::NotCapturing);
        }
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<(), AudioInputError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AudioInputError::NotCapturing);
        }
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<AudioAsset, AudioInputError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AudioInputError::NotCapturing);
        }

        self.capturing.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);

        // Let the stream thread release the device
        tokio::time::sleep(TokioDuration::from_millis(100)).await;

        let sample_rate = self.device_sample_rate.load(Ordering::SeqCst);
        if sample_rate == 0 {
            return Err(AudioInputError::CaptureFailed("Sample rate not set".into()));
        }

        let samples = {
            let mut buffer = self.buffer.lock().unwrap();
            std::mem::take(&mut *buffer)
        };
        if samples.is_empty() {
            return Err(AudioInputError::CaptureFailed(
                "No audio data captured".to_string(),
            ));
        }

        let encoder = self.encoder;
        let bytes = tokio::task::spawn_blocking(move || encoder.encode(&samples, sample_rate))
            .await
            .map_err(|e| AudioInputError::EncodeFailed(format!("Encode task error: {}", e)))?
            .map_err(|e| AudioInputError::EncodeFailed(e.to_string()))?;

        Ok(AudioAsset::from_bytes(bytes, encoder.mime_type()))
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.capturing.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_single_channel() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(CpalMicrophone::to_mono(&mono, 1), mono);
    }

    #[test]
    fn to_mono_averages_stereo_pairs() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(CpalMicrophone::to_mono(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn microphone_default_state() {
        let microphone = CpalMicrophone::new(AssetEncoder::Wav);
        assert!(!microphone.is_capturing());
    }

    #[tokio::test]
    async fn pause_without_start_fails() {
        let microphone = CpalMicrophone::new(AssetEncoder::Wav);
        assert!(matches!(
            microphone.pause().await.unwrap_err(),
            AudioInputError::NotCapturing
        ));
    }
}
