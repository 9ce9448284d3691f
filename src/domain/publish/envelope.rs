//! Published envelope: the top-level remote object for a trace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::trace::Trace;

/// Plaintext summary of a published trace.
///
/// Always stored unencrypted — the shared index needs it for listings
/// without a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMetadata {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub duration_sec: u64,
    pub is_public: bool,
    pub has_password: bool,
    pub location_count: usize,
    pub annotation_count: usize,
}

impl PublishMetadata {
    /// Summarize a trace for publication.
    pub fn for_trace(trace: &Trace, is_public: bool, has_password: bool) -> Self {
        Self {
            id: trace.id,
            created_at: trace.created_at,
            duration_sec: trace.duration_sec,
            is_public,
            has_password,
            location_count: trace.locations.len(),
            annotation_count: trace.annotations.len(),
        }
    }
}

/// The top-level published object.
///
/// Never mutated in place; republishing replaces the whole envelope.
/// Plaintext envelopes store the trace fields inline next to `metadata`;
/// encrypted envelopes carry the ciphertext blob plus the same plaintext
/// metadata. The untagged representation decodes both layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedEnvelope {
    Encrypted {
        encrypted: bool,
        metadata: PublishMetadata,
        /// Base64 ciphertext blob from the crypto codec.
        data: String,
    },
    Plain {
        #[serde(flatten)]
        trace: Trace,
        metadata: PublishMetadata,
    },
}

impl PublishedEnvelope {
    pub fn encrypted(metadata: PublishMetadata, data: String) -> Self {
        Self::Encrypted {
            encrypted: true,
            metadata,
            data,
        }
    }

    pub fn plain(trace: Trace, metadata: PublishMetadata) -> Self {
        Self::Plain { trace, metadata }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted { encrypted: true, .. })
    }

    pub fn metadata(&self) -> &PublishMetadata {
        match self {
            Self::Encrypted { metadata, .. } => metadata,
            Self::Plain { metadata, .. } => metadata,
        }
    }
}
