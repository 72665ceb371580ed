//! Telemetry for the monitoring service
//!
//! - `metrics` - Prometheus counters and histograms for probes
//! - `notifier` - non-blocking status-change notifications

pub mod metrics;
pub mod notifier;

pub use metrics::ProbeMetrics;
pub use notifier::{NotificationDispatcher, WebhookClient};
