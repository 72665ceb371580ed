//! Status-change notifications
//!
//! `notify` never waits on delivery: events go onto a bounded queue and a
//! background task posts them to the configured webhook. Failures are logged
//! and counted, never returned to the caller.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use super::ProbeMetrics;
use crate::config::ServiceConfig;
use crate::contracts::StatusChange;
use crate::error::{MonitorError, Result};

/// Webhook client for Slack-compatible endpoints
pub struct WebhookClient {
    url: String,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Post one status change
    pub async fn deliver(&self, change: &StatusChange) -> Result<()> {
        let icon = if change.is_recovery() {
            ":white_check_mark:"
        } else {
            ":rotating_light:"
        };
        let payload = json!({
            "text": format!("{} {}", icon, change.summary()),
            "event": change,
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MonitorError::Http(format!(
                "Webhook returned {}",
                response.status()
            )))
        }
    }
}

/// Fire-and-forget notification queue
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<StatusChange>,
    metrics: Arc<ProbeMetrics>,
}

impl NotificationDispatcher {
    /// Create dispatcher and spawn its delivery task.
    ///
    /// Without a webhook URL events are only logged.
    pub fn new(config: &ServiceConfig, metrics: Arc<ProbeMetrics>) -> Result<Self> {
        let webhook = config
            .notify_webhook_url
            .as_deref()
            .map(|url| WebhookClient::new(url, config.notify_timeout()))
            .transpose()?;

        let (sender, receiver) = mpsc::channel(config.notify_queue_size.max(1));
        tokio::spawn(Self::background_delivery(receiver, webhook, metrics.clone()));

        Ok(Self { sender, metrics })
    }

    /// Queue a status change without waiting
    pub fn notify(&self, change: StatusChange) {
        match self.sender.try_send(change) {
            Ok(()) => {}
            Err(TrySendError::Full(change)) => {
                self.metrics.record_notification("dropped");
                warn!(
                    monitor_id = %change.monitor_id,
                    "Notification queue full, dropping status change"
                );
            }
            Err(TrySendError::Closed(change)) => {
                self.metrics.record_notification("dropped");
                error!(
                    monitor_id = %change.monitor_id,
                    "Notification task stopped, dropping status change"
                );
            }
        }
    }

    async fn background_delivery(
        mut receiver: mpsc::Receiver<StatusChange>,
        webhook: Option<WebhookClient>,
        metrics: Arc<ProbeMetrics>,
    ) {
        while let Some(change) = receiver.recv().await {
            info!(
                monitor_id = %change.monitor_id,
                client_id = %change.client_id,
                family = %change.service_family,
                previous = %change.previous,
                current = %change.current,
                "Integration status changed"
            );

            let Some(webhook) = &webhook else {
                metrics.record_notification("logged");
                continue;
            };

            match webhook.deliver(&change).await {
                Ok(()) => metrics.record_notification("delivered"),
                Err(e) => {
                    metrics.record_notification("failed");
                    error!(error = %e, monitor_id = %change.monitor_id, "Failed to deliver notification");
                }
            }
        }
    }
}
