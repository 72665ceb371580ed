//! In-memory monitor registry and metric history
//!
//! Holds monitor records, appends one `MetricRecord` per probe and rolls the
//! history up into uptime and latency summaries.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::contracts::*;
use crate::error::{MonitorError, Result};

/// Records older than this are pruned; matches the widest `TimeRange`
pub fn history_retention() -> Duration {
    TimeRange::ThirtyDays.duration()
}

#[derive(Default)]
struct RegistryState {
    monitors: HashMap<Uuid, IntegrationMonitor>,
    history: HashMap<Uuid, Vec<MetricRecord>>,
}

/// Monitor registry
#[derive(Default)]
pub struct MonitorRegistry {
    state: RwLock<RegistryState>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor; it starts in `unknown` until first probed
    pub async fn register(&self, new: NewMonitor) -> IntegrationMonitor {
        let monitor = IntegrationMonitor {
            id: Uuid::new_v4(),
            name: new
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| new.target.service_family.display_name().to_string()),
            client_id: new.client_id,
            target: new.target,
            current_status: HealthStatus::Unknown,
            last_checked_at: None,
            last_error: None,
            created_at: Utc::now(),
        };

        let mut state = self.state.write().await;
        state.monitors.insert(monitor.id, monitor.clone());
        state.history.insert(monitor.id, Vec::new());

        tracing::info!(
            monitor_id = %monitor.id,
            client_id = %monitor.client_id,
            family = %monitor.service_family(),
            "Registered integration monitor"
        );
        monitor
    }

    pub async fn get(&self, id: Uuid) -> Result<IntegrationMonitor> {
        self.state
            .read()
            .await
            .monitors
            .get(&id)
            .cloned()
            .ok_or(MonitorError::NotFound(id))
    }

    /// Monitors ordered by creation, optionally for one client
    pub async fn list(&self, client_id: Option<&str>) -> Vec<IntegrationMonitor> {
        let state = self.state.read().await;
        let mut monitors: Vec<_> = state
            .monitors
            .values()
            .filter(|m| client_id.map_or(true, |c| m.client_id == c))
            .cloned()
            .collect();
        monitors.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        monitors
    }

    /// Remove a monitor together with its history
    pub async fn remove(&self, id: Uuid) -> Result<IntegrationMonitor> {
        let mut state = self.state.write().await;
        state.history.remove(&id);
        state.monitors.remove(&id).ok_or(MonitorError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.monitors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Store a probe outcome and update the monitor's current status.
    ///
    /// `at` is when the probe started. Returns the updated monitor and, when
    /// the status moved, the change. The first probe of a fresh monitor never
    /// counts as a change. A result that started before the last recorded
    /// probe only lands in history; the current status keeps the newer probe.
    pub async fn record(
        &self,
        id: Uuid,
        result: &ProbeResult,
        at: DateTime<Utc>,
    ) -> Result<(IntegrationMonitor, Option<StatusChange>)> {
        let mut state = self.state.write().await;
        let monitor = state.monitors.get_mut(&id).ok_or(MonitorError::NotFound(id))?;

        let previous = monitor.current_status;
        let first_probe = monitor.last_checked_at.is_none();
        let stale = monitor.last_checked_at.map_or(false, |last| at < last);

        let change = if stale {
            tracing::debug!(
                monitor_id = %id,
                status = %result.status,
                "Result overtaken by a newer probe; history only"
            );
            None
        } else {
            monitor.current_status = result.status;
            monitor.last_checked_at = Some(at);
            monitor.last_error = result.error_message.clone();

            (!first_probe && previous != result.status).then(|| StatusChange {
                monitor_id: id,
                client_id: monitor.client_id.clone(),
                monitor_name: monitor.name.clone(),
                service_family: monitor.service_family(),
                previous,
                current: result.status,
                error_message: result.error_message.clone(),
                changed_at: at,
            })
        };
        let updated = monitor.clone();

        let cutoff = updated.last_checked_at.unwrap_or(at) - history_retention();
        let history = state.history.entry(id).or_default();
        history.retain(|r| r.recorded_at >= cutoff);
        if at >= cutoff {
            let position = history.partition_point(|r| r.recorded_at <= at);
            history.insert(position, MetricRecord::from_result(id, result, at));
        }

        Ok((updated, change))
    }

    /// Summarize the history inside `range`, ending at `now`
    pub async fn summary(&self, id: Uuid, range: TimeRange, now: DateTime<Utc>) -> Result<MetricsSummary> {
        let state = self.state.read().await;
        let monitor = state.monitors.get(&id).ok_or(MonitorError::NotFound(id))?;
        let since = range.since(now);

        let records: Vec<MetricRecord> = state
            .history
            .get(&id)
            .map(|history| {
                history
                    .iter()
                    .filter(|r| r.recorded_at >= since && r.recorded_at <= now)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(MetricsSummary::aggregate(id, range, monitor.current_status, records))
    }
}
