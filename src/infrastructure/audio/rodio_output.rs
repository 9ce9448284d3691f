//! Audio playback using rodio
//!
//! The rodio OutputStream is not Send, so it lives on a keeper thread for
//! the lifetime of the loaded asset; the Sink handle crosses threads
//! freely. Dropping the handle unblocks the keeper, which tears the
//! output stream down.

use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::application::ports::{AudioOutput, AudioOutputError};
use crate::domain::trace::AudioAsset;

struct LoadedSink {
    sink: rodio::Sink,
    /// Decoded-from bytes, kept to rebuild the source after it runs dry
    bytes: Vec<u8>,
    /// Dropping this releases the keeper thread and the output stream
    _keepalive: std_mpsc::Sender<()>,
}

/// Playback adapter over the default audio output device.
pub struct RodioAudioOutput {
    loaded: StdMutex<Option<LoadedSink>>,
}

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self {
            loaded: StdMutex::new(None),
        }
    }

    async fn asset_bytes(asset: &AudioAsset) -> Result<Vec<u8>, AudioOutputError> {
        if let Some(data) = &asset.data {
            return Ok(data.clone());
        }
        let Some(file) = &asset.file else {
            return Err(AudioOutputError::DecodeFailed(
                "asset has neither inline data nor a file".into(),
            ));
        };
        tokio::fs::read(file)
            .await
            .map_err(|e| AudioOutputError::OpenFailed(e.to_string()))
    }

    fn with_sink<T>(
        &self,
        f: impl FnOnce(&rodio::Sink) -> T,
    ) -> Result<T, AudioOutputError> {
        let loaded = self.loaded.lock().unwrap();
        let loaded = loaded.as_ref().ok_or(AudioOutputError::NotLoaded)?;
        Ok(f(&loaded.sink))
    }
}

impl Default for RodioAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    async fn load(&self, asset: &AudioAsset) -> Result<(), AudioOutputError> {
        let bytes = Self::asset_bytes(asset).await?;
        let bytes_copy = bytes.clone();

        let (result_tx, result_rx) = oneshot::channel();
        let (keepalive_tx, keepalive_rx) = std_mpsc::channel::<()>();

        std::thread::spawn(move || {
            let built = (|| {
                let (stream, handle) = rodio::OutputStream::try_default()
                    .map_err(|e| AudioOutputError::OpenFailed(e.to_string()))?;
                let sink = rodio::Sink::try_new(&handle)
                    .map_err(|e| AudioOutputError::OpenFailed(e.to_string()))?;
                let decoder = rodio::Decoder::new(Cursor::new(bytes))
                    .map_err(|e| AudioOutputError::DecodeFailed(e.to_string()))?;
                sink.append(decoder);
                sink.pause();
                Ok((stream, sink))
            })();

            match built {
                Ok((stream, sink)) => {
                    if result_tx.send(Ok(sink)).is_err() {
                        return;
                    }
                    // Park until the LoadedSink handle is dropped
                    let _ = keepalive_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = result_tx.send(Err(e));
                }
            }
        });

        let sink = result_rx
            .await
            .map_err(|_| AudioOutputError::OpenFailed("audio output thread died".into()))??;

        *self.loaded.lock().unwrap() = Some(LoadedSink {
            sink,
            bytes: bytes_copy,
            _keepalive: keepalive_tx,
        });
        Ok(())
    }

    fn play(&self) -> Result<(), AudioOutputError> {
        self.with_sink(|sink| sink.play())
    }

    fn pause(&self) -> Result<(), AudioOutputError> {
        self.with_sink(|sink| sink.pause())
    }

    fn seek(&self, position_sec: f64) -> Result<(), AudioOutputError> {
        let loaded = self.loaded.lock().unwrap();
        let loaded = loaded.as_ref().ok_or(AudioOutputError::NotLoaded)?;

        // A sink that played to its end has dropped its source; rebuild it
        // so the seek has something to land in
        if loaded.sink.empty() {
            let decoder = rodio::Decoder::new(Cursor::new(loaded.bytes.clone()))
                .map_err(|e| AudioOutputError::DecodeFailed(e.to_string()))?;
            loaded.sink.append(decoder);
            loaded.sink.pause();
        }

        loaded
            .sink
            .try_seek(Duration::from_secs_f64(position_sec.max(0.0)))
            .map_err(|e| AudioOutputError::SeekFailed(format!("{e:?}")))
    }

    fn position_sec(&self) -> f64 {
        self.with_sink(|sink| sink.get_pos().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn is_finished(&self) -> bool {
        self.with_sink(|sink| sink.empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::AudioMimeType;

    #[test]
    fn operations_before_load_report_not_loaded() {
        let output = RodioAudioOutput::new();
        assert!(matches!(
            output.play().unwrap_err(),
            AudioOutputError::NotLoaded
        ));
        assert_eq!(output.position_sec(), 0.0);
        assert!(!output.is_finished());
    }

    #[tokio::test]
    async fn asset_without_bytes_or_file_is_rejected() {
        let asset = AudioAsset {
            mime_type: AudioMimeType::Wav,
            file: None,
            data: None,
        };
        assert!(matches!(
            RodioAudioOutput::asset_bytes(&asset).await.unwrap_err(),
            AudioOutputError::DecodeFailed(_)
        ));
    }
}
