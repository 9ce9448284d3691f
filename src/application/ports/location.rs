//! Location source port interface

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::geo::RawFix;

/// Location source errors
#[derive(Debug, Clone, Error)]
pub enum LocationError {
    #[error("Failed to connect to location source: {0}")]
    ConnectFailed(String),

    #[error("Location stream error: {0}")]
    StreamError(String),

    #[error("Location source unavailable")]
    Unavailable,
}

/// A live subscription to raw position fixes.
///
/// Fixes arrive on the channel in sensor order. Dropping the subscription
/// (or calling [`unsubscribe`](Self::unsubscribe)) tears down the feed.
pub struct LocationSubscription {
    fixes: mpsc::Receiver<RawFix>,
    feed: Option<JoinHandle<()>>,
}

impl LocationSubscription {
    /// Pair a fix channel with the task that feeds it.
    pub fn new(fixes: mpsc::Receiver<RawFix>, feed: JoinHandle<()>) -> Self {
        Self {
            fixes,
            feed: Some(feed),
        }
    }

    /// Receive the next fix; `None` when the feed has ended.
    pub async fn next_fix(&mut self) -> Option<RawFix> {
        self.fixes.recv().await
    }

    /// Stop the feed.
    pub fn unsubscribe(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
        self.fixes.close();
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
    }
}

/// Port for subscribing to position updates.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Open a fix subscription.
    ///
    /// Failure here is non-fatal to a capture session: the session proceeds
    /// audio-only and surfaces the error as a warning.
    async fn subscribe(&self) -> Result<LocationSubscription, LocationError>;
}
