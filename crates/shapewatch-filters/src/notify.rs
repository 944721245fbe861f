//! Delivery of a new subscriber's access token.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget delivery; the directory logs failures and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &str, token: &str) -> Result<(), NotifyError>;
}
