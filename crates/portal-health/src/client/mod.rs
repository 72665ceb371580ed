//! Client for the monitoring API
//!
//! Used by the portal's request handlers to register monitors, trigger
//! checks and read metric summaries.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::contracts::*;
use crate::engine::WORKATO_TIMEOUT;

/// Monitoring API client
pub struct PortalHealthClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl PortalHealthClient {
    /// Create new client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            // Check-now waits on the slowest family's probe
            timeout: WORKATO_TIMEOUT + Duration::from_secs(5),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(ClientError::Server {
            status: status.as_u16(),
            message: error_text,
        })
    }

    /// Probe an unregistered target
    pub async fn probe(&self, target: &ProbeTarget) -> Result<ProbeResult, ClientError> {
        self.send(self.client.post(self.url("/api/v1/probe")).json(target))
            .await
    }

    pub async fn register(&self, monitor: &NewMonitor) -> Result<MonitorView, ClientError> {
        self.send(self.client.post(self.url("/api/v1/monitors")).json(monitor))
            .await
    }

    pub async fn list(&self, client_id: Option<&str>) -> Result<Vec<MonitorView>, ClientError> {
        let mut request = self.client.get(self.url("/api/v1/monitors"));
        if let Some(client_id) = client_id {
            request = request.query(&[("client_id", client_id)]);
        }
        self.send(request).await
    }

    /// Trigger an on-demand check
    pub async fn check_now(&self, id: Uuid) -> Result<CheckOutcome, ClientError> {
        self.send(
            self.client
                .post(self.url(&format!("/api/v1/monitors/{}/check", id))),
        )
        .await
    }

    pub async fn metrics(&self, id: Uuid, range: TimeRange) -> Result<MetricsSummary, ClientError> {
        self.send(
            self.client
                .get(self.url(&format!("/api/v1/monitors/{}/metrics", id)))
                .query(&[("range", range.as_str())]),
        )
        .await
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/v1/monitors/{}", id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
}
