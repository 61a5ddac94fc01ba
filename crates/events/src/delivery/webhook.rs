//! Anonymous usage beacon.
//!
//! [`UsageWebhook`] records the outcome of a run by issuing an HTTP GET to
//! a webhook URL with `exit_code` and `error` query parameters. It only
//! sends when usage collection is enabled and a URL is configured. The
//! orchestrator calls it fire-and-forget; every failure is swallowed there.

use std::time::Duration;

use async_trait::async_trait;
use scriptsui_core::scripting::usage::{UsageRecord, UsageReportError, UsageReporter};

/// HTTP request timeout for a single beacon.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for beacon delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// UsageWebhook
// ---------------------------------------------------------------------------

/// Whether and where to send usage beacons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageWebhookConfig {
    /// User opt-in. Nothing is sent while this is `false`.
    pub enabled: bool,
    pub url: Option<String>,
}

/// Sends run outcomes to the usage webhook.
pub struct UsageWebhook {
    client: reqwest::Client,
    config: UsageWebhookConfig,
}

impl UsageWebhook {
    pub fn new(config: UsageWebhookConfig) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// URL the beacon goes to, or `None` when sending is disabled.
    pub fn target(&self) -> Option<&str> {
        if !self.config.enabled {
            return None;
        }
        self.config.url.as_deref().filter(|url| !url.is_empty())
    }

    /// Issue a single GET request and check the response status.
    pub async fn send(&self, url: &str, record: &UsageRecord) -> Result<(), WebhookError> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("exit_code", record.exit_code.to_string()),
                ("error", record.error.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        tracing::debug!("Sent anonymous usage data");
        Ok(())
    }
}

#[async_trait]
impl UsageReporter for UsageWebhook {
    async fn report(&self, record: UsageRecord) -> Result<(), UsageReportError> {
        let Some(url) = self.target() else {
            return Ok(());
        };
        self.send(url, &record)
            .await
            .map_err(|e| UsageReportError(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
