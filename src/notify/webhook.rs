//! Slack incoming-webhook delivery.

use crate::report::NotificationPayload;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Posts notification payloads to a Slack incoming webhook.
pub struct WebhookClient {
    url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: String, timeout_seconds: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url,
            timeout_seconds,
            http_client,
        })
    }

    /// Post the payload with CI placeholders filled from the environment.
    pub async fn publish(&self, payload: &NotificationPayload) -> Result<()> {
        self.publish_with(payload, |name| std::env::var(name).ok()).await
    }

    async fn publish_with<F>(&self, payload: &NotificationPayload, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolved = payload.with_placeholders_resolved(lookup);
        debug!("Posting notification to webhook");

        let response = self
            .http_client
            .post(&self.url)
            .json(&resolved)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Webhook timed out after {}s", self.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to webhook host")
                } else {
                    anyhow::anyhow!("Failed to send webhook request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Webhook error {}: {}", status, body));
        }

        info!("Notification posted to webhook");
        Ok(())
    }
}
