use crate::dbsync_api::truncate;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Outbound channel for a composed message
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), AppError>;
}

/// Body accepted by a Discord-style execute-webhook endpoint
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Chat webhook client. The URL carries the webhook token and is never logged.
pub struct DiscordWebhook {
    url: String,
    http: Client,
}

impl DiscordWebhook {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            url: url.to_string(),
            http,
        }
    }

    fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, message: &str) -> Result<(), AppError> {
        tracing::debug!(host = %self.host(), "posting to webhook");

        let resp = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { content: message })
            .send()
            .await
            // reqwest errors embed the URL
            .map_err(|e| {
                AppError::DeliveryError(format!("Webhook request failed: {}", e.without_url()))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "Webhook returned {status}: {}",
                truncate(&body, 200)
            )));
        }

        Ok(())
    }
}

/// Writes the message to the log instead of delivering it
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), AppError> {
        tracing::info!(%message, "dry run, not delivering");
        Ok(())
    }
}
