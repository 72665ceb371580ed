//! Monitoring service
//!
//! Ties the prober to the registry: every probe that belongs to a monitor is
//! recorded, counted, and turned into a notification when the status moves.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::contracts::*;
use crate::engine::HealthProber;
use crate::error::{MonitorError, Result};
use crate::store::MonitorRegistry;
use crate::telemetry::{NotificationDispatcher, ProbeMetrics};

pub struct MonitoringService {
    prober: HealthProber,
    registry: MonitorRegistry,
    metrics: Arc<ProbeMetrics>,
    notifier: NotificationDispatcher,
}

impl MonitoringService {
    /// Create the service; spawns the notification task
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let metrics = Arc::new(ProbeMetrics::new()?);
        let notifier = NotificationDispatcher::new(config, metrics.clone())?;
        Ok(Self {
            prober: HealthProber::new(),
            registry: MonitorRegistry::new(),
            metrics,
            notifier,
        })
    }

    /// Swap the prober, e.g. for shortened timeouts
    pub fn with_prober(mut self, prober: HealthProber) -> Self {
        self.prober = prober;
        self
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &ProbeMetrics {
        &self.metrics
    }

    /// Probe a target that is not registered
    pub async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        let result = self.prober.probe(target).await;
        self.metrics.observe_probe(target.service_family, &result);
        result
    }

    pub async fn register(&self, new: NewMonitor) -> Result<IntegrationMonitor> {
        if new.client_id.trim().is_empty() {
            return Err(MonitorError::invalid_input("client_id must not be empty"));
        }
        let monitor = self.registry.register(new).await;
        self.metrics.set_monitor_count(self.registry.len().await);
        Ok(monitor)
    }

    pub async fn remove(&self, id: Uuid) -> Result<IntegrationMonitor> {
        let monitor = self.registry.remove(id).await?;
        self.metrics.set_monitor_count(self.registry.len().await);
        Ok(monitor)
    }

    /// Probe a registered monitor now and record the outcome
    pub async fn check_now(&self, id: Uuid) -> Result<CheckOutcome> {
        let monitor = self.registry.get(id).await?;
        let started_at = Utc::now();
        let result = self.probe(&monitor.target).await;

        let (monitor, change) = self.registry.record(id, &result, started_at).await?;

        tracing::info!(
            monitor_id = %id,
            client_id = %monitor.client_id,
            family = %monitor.service_family(),
            status = %result.status,
            response_time_ms = ?result.response_time_ms,
            "Integration checked"
        );

        if let Some(change) = change {
            self.notifier.notify(change);
        }

        Ok(CheckOutcome {
            monitor: MonitorView::from(&monitor),
            result,
        })
    }

    pub async fn summary(&self, id: Uuid, range: TimeRange) -> Result<MetricsSummary> {
        self.registry.summary(id, range, Utc::now()).await
    }
}
