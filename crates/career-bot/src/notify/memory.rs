//! In-memory notifier for tests and local runs

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

use super::Notifier;
use crate::error::{CareerError, Result};

/// Keeps every message it is given
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
    received: Notify,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Wait until at least `count` messages have arrived or `limit` passes
    pub async fn wait_for(&self, count: usize, limit: Duration) -> Result<Vec<String>> {
        let arrived = async {
            loop {
                let notified = self.received.notified();
                let messages = self.messages();
                if messages.len() >= count {
                    return messages;
                }
                notified.await;
            }
        };

        tokio::time::timeout(limit, arrived).await.map_err(|_| {
            CareerError::Notify(format!(
                "expected {count} notifications within {limit:?}, got {}",
                self.messages().len()
            ))
        })
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
        self.received.notify_waiters();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
