//! Chat incoming-webhook sink
//!
//! Posts `{"text": "..."}` to a Slack-compatible incoming webhook. The
//! webhook URL embeds a secret, so it is never logged or shown in `Debug`.

use async_trait::async_trait;
use dns_tools_core::traits::Notifier;
use dns_tools_core::{ChangeEvent, Error, Result};
use serde::Serialize;

const SINK: &str = "slack";

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Slack incoming-webhook notifier
pub struct SlackWebhook {
    /// Webhook URL
    /// ⚠️ NEVER log this value
    url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SlackWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebhook")
            .field("url", &"<REDACTED>")
            .finish()
    }
}

impl SlackWebhook {
    /// Create a notifier for a webhook URL
    ///
    /// # Returns
    ///
    /// - `Ok(SlackWebhook)`: Ready to post
    /// - `Err(Error::Configuration)`: Empty URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::config("SLACK_WEBHOOK_URL is not set"));
        }

        Ok(Self {
            url,
            client: crate::build_client(SINK)?,
        })
    }

    /// Post a plain-text message
    pub async fn post_message(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { text })
            .send()
            .await
            // reqwest errors carry the URL; drop it to keep the secret out of logs
            .map_err(|e| Error::notification(SINK, format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(
                SINK,
                format!("Webhook returned {}: {}", status, body.trim()),
            ));
        }

        tracing::debug!("Posted message to chat webhook");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn notify(&self, event: &ChangeEvent) -> Result<()> {
        self.post_message(&event.webhook_text()).await
    }

    fn sink_name(&self) -> &'static str {
        SINK
    }
}
