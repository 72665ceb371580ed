//! Service configuration
//!
//! Defaults, `PORTAL_HEALTH_*` environment overrides, a builder, and
//! monitor seed files.

use std::path::Path;
use std::time::Duration;

use crate::contracts::NewMonitor;
use crate::error::Result;

/// Monitoring service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Bind host for the HTTP API
    pub host: String,

    /// Bind port for the HTTP API
    pub port: u16,

    /// Seconds between scheduled probe rounds; `None` keeps probing on demand
    pub schedule_interval_secs: Option<u64>,

    /// Probes allowed in flight during one scheduled round
    pub max_concurrent_probes: usize,

    /// Webhook receiving status-change notifications
    pub notify_webhook_url: Option<String>,

    /// Notification queue capacity
    pub notify_queue_size: usize,

    /// Webhook request timeout in milliseconds
    pub notify_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            schedule_interval_secs: None,
            max_concurrent_probes: 4,
            notify_webhook_url: None,
            notify_queue_size: 100,
            notify_timeout_ms: 5000,
        }
    }
}

impl ServiceConfig {
    /// Create a new config builder
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("PORTAL_HEALTH_HOST").unwrap_or(defaults.host),
            port: lookup("PORTAL_HEALTH_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            schedule_interval_secs: lookup("PORTAL_HEALTH_SCHEDULE_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0),
            max_concurrent_probes: lookup("PORTAL_HEALTH_MAX_CONCURRENT_PROBES")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_probes),
            notify_webhook_url: lookup("PORTAL_HEALTH_WEBHOOK_URL").filter(|v| !v.is_empty()),
            notify_queue_size: lookup("PORTAL_HEALTH_NOTIFY_QUEUE_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.notify_queue_size),
            notify_timeout_ms: lookup("PORTAL_HEALTH_NOTIFY_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.notify_timeout_ms),
        }
    }

    pub fn schedule_interval(&self) -> Option<Duration> {
        self.schedule_interval_secs.map(Duration::from_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

/// Builder for ServiceConfig
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable scheduled probing
    pub fn schedule_every(mut self, secs: u64) -> Self {
        self.config.schedule_interval_secs = Some(secs).filter(|s| *s > 0);
        self
    }

    pub fn max_concurrent_probes(mut self, n: usize) -> Self {
        self.config.max_concurrent_probes = n.max(1);
        self
    }

    pub fn webhook(mut self, url: impl Into<String>) -> Self {
        self.config.notify_webhook_url = Some(url.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServiceConfig {
        self.config
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a monitor list; YAML for `.yaml`/`.yml`, JSON otherwise
pub fn parse_monitors(content: &str, path: &Path) -> Result<Vec<NewMonitor>> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

/// Read a monitor seed file
pub fn load_monitors(path: impl AsRef<Path>) -> Result<Vec<NewMonitor>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_monitors(&content, path)
}
