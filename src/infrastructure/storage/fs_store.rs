//! Filesystem trace store adapter
//!
//! One JSON document per trace under the data directory, with the audio
//! asset in a sidecar file next to it. Writes go through a temp file and
//! rename, so a reader never observes a partially written trace.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{StorageError, TraceStore};
use crate::domain::trace::{AudioAsset, Trace};

/// Trace store rooted at a data directory.
pub struct FsTraceStore {
    dir: PathBuf,
}

impl FsTraceStore {
    /// Create a store under the platform data dir.
    pub fn new() -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sauntercast")
            .join("traces");
        Self { dir }
    }

    /// Create with custom directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn doc_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Load the audio bytes of a stored trace into an inline asset.
    /// Used when a payload needs to travel (publish with audio,
    /// transcription upload).
    pub async fn load_audio(&self, trace: &Trace) -> Result<AudioAsset, StorageError> {
        let Some(asset) = &trace.audio else {
            return Err(StorageError::ReadFailed("trace has no audio".into()));
        };
        if asset.data.is_some() {
            return Ok(asset.clone());
        }
        let Some(file) = &asset.file else {
            return Err(StorageError::ReadFailed("audio asset has no file".into()));
        };
        let bytes = fs::read(file)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(AudioAsset::from_bytes(bytes, asset.mime_type))
    }

    async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

impl Default for FsTraceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TraceStore for FsTraceStore {
    async fn get(&self, id: Uuid) -> Result<Trace, StorageError> {
        let path = self.doc_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id));
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| StorageError::ReadFailed(e.to_string()))
    }

    async fn put(&self, trace: &Trace) -> Result<(), StorageError> {
        self.ensure_dir().await?;

        // Inline audio bytes are spilled to a sidecar file; the document
        // keeps only the file reference
        let mut stored = trace.clone();
        if let Some(asset) = &stored.audio {
            if let (Some(bytes), None) = (&asset.data, &asset.file) {
                let sidecar = self
                    .dir
                    .join(format!("{}.{}", trace.id, asset.mime_type.extension()));
                fs::write(&sidecar, bytes)
                    .await
                    .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
                stored.audio = Some(AudioAsset::from_file(sidecar, asset.mime_type));
            }
        }

        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        let path = self.doc_path(trace.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let trace = self.get(id).await?;
        // Sidecar first; a missing sidecar is not an error
        if let Some(file) = trace.audio.as_ref().and_then(|a| a.file.as_ref()) {
            let _ = fs::remove_file(file).await;
        }
        fs::remove_file(self.doc_path(id))
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<Trace>, StorageError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        let mut traces = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            match serde_json::from_str::<Trace>(&content) {
                Ok(trace) => traces.push(trace),
                Err(e) => log::warn!("skipping unreadable trace {}: {e}", path.display()),
            }
        }

        traces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(traces)
    }
}
