use crate::{Alert, Channel, CoreError, Item};
use async_trait::async_trait;

/// Source of recent posts for a named channel.
#[async_trait]
pub trait ChannelFetcher: Send + Sync {
    /// Establishes the session with the source. Called once before polling starts.
    async fn connect(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Up to `limit` most recent items, newest first.
    async fn fetch_recent(&self, channel: &Channel, limit: u32) -> Result<Vec<Item>, CoreError>;
}

/// Delivers an alert to the review team.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), CoreError>;
}
