//! Publish pipeline use case
//!
//! Prepares a trace for the static content host: validates the duration
//! cap, builds the always-plaintext metadata summary, optionally encrypts
//! the payload, writes the uniquely-keyed trace object and upserts the
//! shared index with an optimistic revision precondition.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::publish::{PublishMetadata, PublishedEnvelope};
use crate::domain::trace::Trace;

use super::ports::{CryptoError, PayloadCipher, RemoteStore, RemoteStoreError};

/// Longest trace that may be published, in seconds (30 minutes).
pub const MAX_PUBLISH_DURATION_SEC: u64 = 1800;

/// Most recent entries kept in the shared index; older ones are evicted.
pub const INDEX_CAPACITY: usize = 100;

const INDEX_PATH: &str = "saunters/index.json";

fn trace_path(id: Uuid) -> String {
    format!("saunters/{id}.json")
}

/// Errors from the publish pipeline
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Trace duration {duration_sec}s exceeds the {max_sec}s publish limit")]
    DurationExceeded { duration_sec: u64, max_sec: u64 },

    /// The envelope is encrypted and no password was supplied.
    #[error("This trace is password protected")]
    PasswordRequired,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The index write targeted stale state; retry the whole publish.
    #[error("The published index changed concurrently; retry the publish")]
    ConcurrentIndexUpdate,

    #[error("Published trace not found: {0}")]
    TraceNotFound(Uuid),

    #[error(transparent)]
    Remote(RemoteStoreError),

    #[error("Failed to encode publish payload: {0}")]
    Encode(String),
}

impl From<RemoteStoreError> for PublishError {
    fn from(e: RemoteStoreError) -> Self {
        match e {
            RemoteStoreError::Conflict(_) => Self::ConcurrentIndexUpdate,
            other => Self::Remote(other),
        }
    }
}

/// Options for publishing a trace
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub is_public: bool,
    pub password: Option<String>,
    /// Inline the audio bytes into the payload. Off by default; the
    /// published object then carries locations/annotations only.
    pub include_audio: bool,
}

/// Result of a successful publish
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub id: Uuid,
    pub url: String,
    pub encrypted: bool,
}

/// Publish pipeline over a remote object store and a payload cipher.
pub struct PublishPipeline<R, C>
where
    R: RemoteStore,
    C: PayloadCipher + 'static,
{
    remote: R,
    cipher: Arc<C>,
}

impl<R, C> PublishPipeline<R, C>
where
    R: RemoteStore,
    C: PayloadCipher + 'static,
{
    pub fn new(remote: R, cipher: C) -> Self {
        Self {
            remote,
            cipher: Arc::new(cipher),
        }
    }

    /// Publish a trace, replacing any previous envelope under its id.
    pub async fn publish(
        &self,
        trace: &Trace,
        options: PublishOptions,
    ) -> Result<PublishReceipt, PublishError> {
        if trace.duration_sec > MAX_PUBLISH_DURATION_SEC {
            return Err(PublishError::DurationExceeded {
                duration_sec: trace.duration_sec,
                max_sec: MAX_PUBLISH_DURATION_SEC,
            });
        }

        let has_password = options.password.is_some();
        let metadata = PublishMetadata::for_trace(trace, options.is_public, has_password);

        // The payload never references local files; audio travels inline
        // or not at all
        let mut payload = trace.clone();
        payload.audio = if options.include_audio {
            payload
                .audio
                .map(|a| a.detached())
                .filter(|a| a.data.is_some())
        } else {
            None
        };

        let envelope = match &options.password {
            Some(password) => {
                let plain = PublishedEnvelope::plain(payload, metadata.clone());
                let value =
                    serde_json::to_value(&plain).map_err(|e| PublishError::Encode(e.to_string()))?;
                let ciphertext = self.encrypt_blocking(value, password.clone()).await?;
                PublishedEnvelope::encrypted(metadata.clone(), ciphertext)
            }
            None => PublishedEnvelope::plain(payload, metadata.clone()),
        };

        let content = serde_json::to_string_pretty(&envelope)
            .map_err(|e| PublishError::Encode(e.to_string()))?;
        self.remote
            .write(&trace_path(trace.id), &content, None)
            .await?;

        self.upsert_index(metadata).await?;

        Ok(PublishReceipt {
            id: trace.id,
            url: self.remote.public_url(&trace.id.to_string()),
            encrypted: has_password,
        })
    }

    /// Fetch a published trace, decrypting it when required.
    pub async fn fetch(&self, id: Uuid, password: Option<&str>) -> Result<Trace, PublishError> {
        let object = self
            .remote
            .read(&trace_path(id))
            .await?
            .ok_or(PublishError::TraceNotFound(id))?;

        let envelope: PublishedEnvelope = serde_json::from_str(&object.content)
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        match envelope {
            PublishedEnvelope::Plain { trace, .. } => Ok(trace),
            PublishedEnvelope::Encrypted { data, .. } => {
                let password = password.ok_or(PublishError::PasswordRequired)?;
                let value = self.decrypt_blocking(data, password.to_string()).await?;
                serde_json::from_value(value).map_err(|_| CryptoError::DecryptionFailed.into())
            }
        }
    }

    /// Remove a published trace and its index entry.
    pub async fn unpublish(&self, id: Uuid) -> Result<(), PublishError> {
        let path = trace_path(id);
        let object = self
            .remote
            .read(&path)
            .await?
            .ok_or(PublishError::TraceNotFound(id))?;
        self.remote.delete(&path, &object.revision).await?;

        let Some(index_obj) = self.remote.read(INDEX_PATH).await? else {
            return Ok(());
        };
        let mut index: Vec<PublishMetadata> =
            serde_json::from_str(&index_obj.content).unwrap_or_default();
        index.retain(|entry| entry.id != id);
        let content = serde_json::to_string_pretty(&index)
            .map_err(|e| PublishError::Encode(e.to_string()))?;
        self.remote
            .write(INDEX_PATH, &content, Some(&index_obj.revision))
            .await?;
        Ok(())
    }

    /// Public entries of the shared index, newest first.
    pub async fn list_published(&self) -> Result<Vec<PublishMetadata>, PublishError> {
        let Some(object) = self.remote.read(INDEX_PATH).await? else {
            return Ok(vec![]);
        };
        let index: Vec<PublishMetadata> =
            serde_json::from_str(&object.content).unwrap_or_default();
        Ok(index.into_iter().filter(|e| e.is_public).collect())
    }

    /// Read-modify-write of the shared index under a revision precondition.
    /// Update in place when the id is present, else prepend; keep the most
    /// recent `INDEX_CAPACITY` entries.
    async fn upsert_index(&self, metadata: PublishMetadata) -> Result<(), PublishError> {
        let existing = self.remote.read(INDEX_PATH).await?;
        let (mut index, revision) = match &existing {
            Some(object) => (
                serde_json::from_str::<Vec<PublishMetadata>>(&object.content).unwrap_or_default(),
                Some(object.revision.as_str()),
            ),
            None => (vec![], None),
        };

        match index.iter().position(|entry| entry.id == metadata.id) {
            Some(at) => index[at] = metadata,
            None => index.insert(0, metadata),
        }
        index.truncate(INDEX_CAPACITY);

        let content = serde_json::to_string_pretty(&index)
            .map_err(|e| PublishError::Encode(e.to_string()))?;
        self.remote.write(INDEX_PATH, &content, revision).await?;
        Ok(())
    }

    async fn encrypt_blocking(
        &self,
        payload: serde_json::Value,
        password: String,
    ) -> Result<String, PublishError> {
        let cipher = Arc::clone(&self.cipher);
        tokio::task::spawn_blocking(move || cipher.encrypt(&payload, &password))
            .await
            .map_err(|e| PublishError::Encode(e.to_string()))?
            .map_err(PublishError::from)
    }

    async fn decrypt_blocking(
        &self,
        blob: String,
        password: String,
    ) -> Result<serde_json::Value, PublishError> {
        let cipher = Arc::clone(&self.cipher);
        tokio::task::spawn_blocking(move || cipher.decrypt(&blob, &password))
            .await
            .map_err(|e| PublishError::Encode(e.to_string()))?
            .map_err(PublishError::from)
    }
}
