//! Pushover delivery

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::Notifier;
use crate::error::{CareerError, Result};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct PushoverNotifier {
    client: Client,
    endpoint: String,
    token: String,
    user: String,
}

impl PushoverNotifier {
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(TIMEOUT).build()?,
            endpoint: PUSHOVER_URL.into(),
            token: token.into(),
            user: user.into(),
        })
    }

    /// Read `PUSHOVER_TOKEN` and `PUSHOVER_USER`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("PUSHOVER_TOKEN")
            .map_err(|_| CareerError::Config("PUSHOVER_TOKEN not set".into()))?;
        let user = std::env::var("PUSHOVER_USER")
            .map_err(|_| CareerError::Config("PUSHOVER_USER not set".into()))?;
        Self::new(token, user)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("token", self.token.as_str()),
                ("user", self.user.as_str()),
                ("message", message),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CareerError::Notify(format!("Pushover returned {status}: {body}")));
        }

        tracing::debug!("Pushover notification delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "pushover"
    }
}
