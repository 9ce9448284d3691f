//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::geo::DEFAULT_MIN_MOVEMENT_M;

/// Default gpsd endpoint
pub const DEFAULT_GPSD_HOST: &str = "127.0.0.1";
pub const DEFAULT_GPSD_PORT: u16 = 2947;

/// Default branch for the publish target
pub const DEFAULT_PUBLISH_BRANCH: &str = "gh-pages";

/// Publish target configuration (GitHub Pages repository).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// "owner/repo" of the static content host.
    pub repo: Option<String>,
    pub branch: Option<String>,
}

/// Location source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    /// Minimum movement in meters before a fix is recorded.
    pub min_movement_m: Option<f64>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: Option<String>,
    /// Audio encoder for finished assets: "wav" or "flac".
    pub encoder: Option<String>,
    /// Override for the trace data directory.
    pub data_dir: Option<String>,
    pub publish: Option<PublishConfig>,
    pub location: Option<LocationConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            encoder: Some("wav".to_string()),
            data_dir: None,
            publish: Some(PublishConfig {
                repo: None,
                branch: Some(DEFAULT_PUBLISH_BRANCH.to_string()),
            }),
            location: Some(LocationConfig {
                gpsd_host: Some(DEFAULT_GPSD_HOST.to_string()),
                gpsd_port: Some(DEFAULT_GPSD_PORT),
                min_movement_m: Some(DEFAULT_MIN_MOVEMENT_M),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            encoder: other.encoder.or(self.encoder),
            data_dir: other.data_dir.or(self.data_dir),
            publish: Self::merge_publish(self.publish, other.publish),
            location: Self::merge_location(self.location, other.location),
        }
    }

    fn merge_publish(
        base: Option<PublishConfig>,
        other: Option<PublishConfig>,
    ) -> Option<PublishConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(PublishConfig {
                repo: o.repo.or(b.repo),
                branch: o.branch.or(b.branch),
            }),
        }
    }

    fn merge_location(
        base: Option<LocationConfig>,
        other: Option<LocationConfig>,
    ) -> Option<LocationConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(LocationConfig {
                gpsd_host: o.gpsd_host.or(b.gpsd_host),
                gpsd_port: o.gpsd_port.or(b.gpsd_port),
                min_movement_m: o.min_movement_m.or(b.min_movement_m),
            }),
        }
    }

    /// Get encoder name, or "wav" if not set
    pub fn encoder_or_default(&self) -> &str {
        self.encoder.as_deref().unwrap_or("wav")
    }

    /// Get publish repo, if configured
    pub fn publish_repo(&self) -> Option<&str> {
        self.publish.as_ref().and_then(|p| p.repo.as_deref())
    }

    /// Get publish branch, or "gh-pages" if not set
    pub fn publish_branch_or_default(&self) -> &str {
        self.publish
            .as_ref()
            .and_then(|p| p.branch.as_deref())
            .unwrap_or(DEFAULT_PUBLISH_BRANCH)
    }

    /// Get gpsd host, or localhost if not set
    pub fn gpsd_host_or_default(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.gpsd_host.as_deref())
            .unwrap_or(DEFAULT_GPSD_HOST)
    }

    /// Get gpsd port, or 2947 if not set
    pub fn gpsd_port_or_default(&self) -> u16 {
        self.location
            .as_ref()
            .and_then(|l| l.gpsd_port)
            .unwrap_or(DEFAULT_GPSD_PORT)
    }

    /// Get minimum-movement threshold, or the refined default (4 m)
    pub fn min_movement_or_default(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|l| l.min_movement_m)
            .unwrap_or(DEFAULT_MIN_MOVEMENT_M)
    }
}
