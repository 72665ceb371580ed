//! Prometheus metrics for integration probes
//!
//! - `portal_health_probes_total` (counter) - probes by family and status
//! - `portal_health_probe_duration_seconds` (histogram) - probe latency by family
//! - `portal_health_notifications_total` (counter) - notification outcomes
//! - `portal_health_monitors` (gauge) - registered monitors

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::contracts::{ProbeResult, ServiceFamily};
use crate::error::{MonitorError, Result};

const NAMESPACE: &str = "portal_health";

/// Probe metrics for Prometheus
#[derive(Clone)]
pub struct ProbeMetrics {
    registry: Registry,

    /// Probes by family and status
    probes_total: IntCounterVec,

    /// Probe latency by family
    probe_duration_seconds: HistogramVec,

    /// Notifications by result (delivered, failed, dropped, logged)
    notifications_total: IntCounterVec,

    /// Registered monitors
    monitors: IntGauge,
}

impl ProbeMetrics {
    /// Create metrics on a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics and register them with `registry`
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let probes_total = IntCounterVec::new(
            Opts::new("probes_total", "Total number of integration probes").namespace(NAMESPACE),
            &["family", "status"],
        )?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "probe_duration_seconds",
                "Integration probe response time in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
            &["family"],
        )?;

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "notifications_total",
                "Status-change notifications by outcome",
            )
            .namespace(NAMESPACE),
            &["result"],
        )?;

        let monitors = IntGauge::with_opts(
            Opts::new("monitors", "Number of registered integration monitors").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(probes_total.clone()))?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(monitors.clone()))?;

        Ok(Self {
            registry,
            probes_total,
            probe_duration_seconds,
            notifications_total,
            monitors,
        })
    }

    /// Count a probe and, when a request was sent, its latency
    pub fn observe_probe(&self, family: ServiceFamily, result: &ProbeResult) {
        self.probes_total
            .with_label_values(&[family.as_str(), result.status.as_str()])
            .inc();

        if let Some(ms) = result.response_time_ms {
            self.probe_duration_seconds
                .with_label_values(&[family.as_str()])
                .observe(ms as f64 / 1000.0);
        }
    }

    pub fn record_notification(&self, result: &str) {
        self.notifications_total.with_label_values(&[result]).inc();
    }

    pub fn set_monitor_count(&self, count: usize) {
        self.monitors.set(count as i64);
    }

    pub fn probes_total(&self, family: ServiceFamily, status: &str) -> u64 {
        self.probes_total
            .with_label_values(&[family.as_str(), status])
            .get()
    }

    pub fn notifications_total(&self, result: &str) -> u64 {
        self.notifications_total.with_label_values(&[result]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MonitorError::Parse(e.to_string()))
    }
}
