//! Remote object store port interface

use async_trait::async_trait;
use thiserror::Error;

/// Remote store errors
#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    #[error("Remote object not found: {0}")]
    NotFound(String),

    /// The write targeted a stale revision and was rejected by the store.
    #[error("Remote write conflict on {0}")]
    Conflict(String),

    #[error("Remote request failed: {0}")]
    RequestFailed(String),

    #[error("Remote store not configured: {0}")]
    NotConfigured(String),
}

/// A remote object with its store-assigned revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub content: String,
    pub revision: String,
}

/// Port for the static content host's object store.
///
/// Writes with `expected_revision` are optimistic: the store rejects a
/// write whose expectation is stale with [`RemoteStoreError::Conflict`]
/// rather than silently losing an update. Writes without an expectation
/// overwrite unconditionally (used for uniquely-keyed trace objects).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read an object; `Ok(None)` if it does not exist.
    async fn read(&self, path: &str) -> Result<Option<RemoteObject>, RemoteStoreError>;

    async fn write(
        &self,
        path: &str,
        content: &str,
        expected_revision: Option<&str>,
    ) -> Result<(), RemoteStoreError>;

    /// Delete an object at a known revision.
    async fn delete(&self, path: &str, revision: &str) -> Result<(), RemoteStoreError>;

    /// Public URL where a published trace can be viewed.
    fn public_url(&self, id: &str) -> String;
}
