//! Notifications
//!
//! Fire-and-forget delivery of short text messages to the site owner. A
//! failed delivery is logged and dropped; it never reaches the conversation.

mod memory;
mod pushover;

pub use memory::MemoryNotifier;
pub use pushover::PushoverNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Notification sink (Strategy pattern)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    async fn notify(&self, message: &str) -> Result<()>;

    /// Sink name for logs
    fn name(&self) -> &str;
}

/// Writes notifications to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::info!(notification = %message, "Notification (not delivered)");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Pushover when credentials are configured, otherwise the log
pub fn from_env() -> Arc<dyn Notifier> {
    match PushoverNotifier::from_env() {
        Ok(pushover) => Arc::new(pushover),
        Err(e) => {
            tracing::warn!(error = %e, "Pushover not configured, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

/// Send `message` in the background
pub fn spawn_notify(notifier: Arc<dyn Notifier>, message: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&message).await {
            tracing::warn!(notifier = notifier.name(), error = %e, "Notification dropped");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CareerError;

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _message: &str) -> Result<()> {
            Err(CareerError::Notify("offline".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        spawn_notify(Arc::new(Failing), "hello".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_spawned_delivery_arrives() {
        let memory = Arc::new(MemoryNotifier::new());
        spawn_notify(memory.clone(), "Recording hi".into()).await.unwrap();
        assert_eq!(memory.messages(), vec!["Recording hi"]);
    }
}
