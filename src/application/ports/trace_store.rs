//! Trace persistence port interface

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::trace::Trace;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Trace not found: {0}")]
    NotFound(Uuid),

    #[error("Failed to read trace: {0}")]
    ReadFailed(String),

    #[error("Failed to write trace: {0}")]
    WriteFailed(String),

    #[error("Failed to delete trace: {0}")]
    DeleteFailed(String),
}

/// Port for local key-value trace persistence.
///
/// `put` must be atomic: readers never observe a partially written trace.
/// Post-stop mutations (post-hoc annotations, transcription attachment) go
/// through `put` with the full updated trace.
#[async_trait]
pub trait TraceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Trace, StorageError>;

    async fn put(&self, trace: &Trace) -> Result<(), StorageError>;

    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;

    /// List all stored traces, newest first.
    async fn list(&self) -> Result<Vec<Trace>, StorageError>;
}
