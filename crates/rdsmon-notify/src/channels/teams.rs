use crate::error::{NotifyError, Result};
use serde_json::Value;

/// Teams incoming-webhook delivery. One POST per run; failures are
/// surfaced to the caller for logging, never retried here.
pub struct TeamsChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl TeamsChannel {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    pub async fn send(&self, card: &Value) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(card)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("[failed to read response body: {e}]"));
            return Err(NotifyError::WebhookRejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "Teams card delivered");
        Ok(())
    }
}
