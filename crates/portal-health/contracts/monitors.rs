//! Monitor records, metric history and status-change events

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{HealthStatus, ProbeResult, ProbeTarget, RecipeStatus, ServiceFamily};

/// A client's monitored integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationMonitor {
    /// Unique monitor identifier
    pub id: Uuid,

    /// Owning client (tenant)
    pub client_id: String,

    /// Human-readable name
    pub name: String,

    /// What to probe
    pub target: ProbeTarget,

    /// Status from the latest probe
    pub current_status: HealthStatus,

    /// Time of the latest probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,

    /// Message from the latest probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl IntegrationMonitor {
    pub fn service_family(&self) -> ServiceFamily {
        self.target.service_family
    }
}

/// Registration payload for a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMonitor {
    pub client_id: String,

    /// Defaults to the service family's display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub target: ProbeTarget,
}

impl NewMonitor {
    pub fn new(client_id: impl Into<String>, target: ProbeTarget) -> Self {
        Self {
            client_id: client_id.into(),
            name: None,
            target,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Monitor as exposed over the API; credential values never leave the process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorView {
    pub id: Uuid,
    pub client_id: String,
    pub name: String,
    pub service_family: ServiceFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipe_ids: Vec<String>,
    /// Names of the configured credential fields
    pub credential_fields: Vec<String>,
    pub current_status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&IntegrationMonitor> for MonitorView {
    fn from(monitor: &IntegrationMonitor) -> Self {
        Self {
            id: monitor.id,
            client_id: monitor.client_id.clone(),
            name: monitor.name.clone(),
            service_family: monitor.target.service_family,
            endpoint: monitor.target.endpoint.clone(),
            recipe_ids: monitor.target.recipe_ids.clone(),
            credential_fields: monitor.target.credentials.keys(),
            current_status: monitor.current_status,
            last_checked_at: monitor.last_checked_at,
            last_error: monitor.last_error.clone(),
            created_at: monitor.created_at,
        }
    }
}

/// Result of an on-demand check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub monitor: MonitorView,
    pub result: ProbeResult,
}

/// One stored probe outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub monitor_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_statuses: Option<Vec<RecipeStatus>>,
}

impl MetricRecord {
    pub fn from_result(monitor_id: Uuid, result: &ProbeResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            monitor_id,
            recorded_at,
            status: result.status,
            response_time_ms: result.response_time_ms,
            error_message: result.error_message.clone(),
            recipe_statuses: result.recipe_statuses.clone(),
        }
    }
}

/// Look-back window for metric summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[default]
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::OneHour => Duration::hours(1),
            TimeRange::SixHours => Duration::hours(6),
            TimeRange::OneDay => Duration::hours(24),
            TimeRange::SevenDays => Duration::days(7),
            TimeRange::ThirtyDays => Duration::days(30),
        }
    }

    /// Oldest timestamp included in the window ending at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneHour => "1h",
            TimeRange::SixHours => "6h",
            TimeRange::OneDay => "24h",
            TimeRange::SevenDays => "7d",
            TimeRange::ThirtyDays => "30d",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::OneHour),
            "6h" => Ok(TimeRange::SixHours),
            "24h" => Ok(TimeRange::OneDay),
            "7d" => Ok(TimeRange::SevenDays),
            "30d" => Ok(TimeRange::ThirtyDays),
            other => Err(format!(
                "Invalid time range '{}', expected one of 1h, 6h, 24h, 7d, 30d",
                other
            )),
        }
    }
}

/// Uptime and latency rollup for one monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub monitor_id: Uuid,
    pub range: TimeRange,
    pub current_status: HealthStatus,

    /// Checks inside the window
    pub total_checks: u32,

    /// Healthy checks inside the window
    pub healthy_checks: u32,

    /// healthy / total * 100, absent without checks
    pub uptime_percentage: Option<f64>,

    /// Mean of the recorded response times, absent when none were recorded
    pub average_response_time_ms: Option<f64>,

    /// Records inside the window, newest first
    pub records: Vec<MetricRecord>,
}

impl MetricsSummary {
    /// Aggregate `records`, which must already be restricted to the window
    pub fn aggregate(
        monitor_id: Uuid,
        range: TimeRange,
        current_status: HealthStatus,
        mut records: Vec<MetricRecord>,
    ) -> Self {
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        let total = records.len() as u32;
        let healthy = records
            .iter()
            .filter(|r| r.status == HealthStatus::Healthy)
            .count() as u32;

        let uptime = if total > 0 {
            Some(healthy as f64 / total as f64 * 100.0)
        } else {
            None
        };

        let latencies: Vec<u64> = records.iter().filter_map(|r| r.response_time_ms).collect();
        let average = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<u64>() as f64 / latencies.len() as f64)
        };

        Self {
            monitor_id,
            range,
            current_status,
            total_checks: total,
            healthy_checks: healthy,
            uptime_percentage: uptime,
            average_response_time_ms: average,
            records,
        }
    }
}

/// Emitted when a monitor's status differs from its previous probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub monitor_id: Uuid,
    pub client_id: String,
    pub monitor_name: String,
    pub service_family: ServiceFamily,
    pub previous: HealthStatus,
    pub current: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl StatusChange {
    /// One-line summary for chat webhooks
    pub fn summary(&self) -> String {
        let mut text = format!(
            "[{}] {} ({}) changed from {} to {}",
            self.client_id,
            self.monitor_name,
            self.service_family.display_name(),
            self.previous,
            self.current
        );
        if let Some(error) = &self.error_message {
            text.push_str(": ");
            text.push_str(error);
        }
        text
    }

    /// Whether the monitor came back to healthy
    pub fn is_recovery(&self) -> bool {
        self.current == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: HealthStatus, ms: Option<u64>, minutes_ago: i64) -> MetricRecord {
        MetricRecord {
            monitor_id: Uuid::nil(),
            recorded_at: Utc::now() - Duration::minutes(minutes_ago),
            status,
            response_time_ms: ms,
            error_message: None,
            recipe_statuses: None,
        }
    }

    #[test]
    fn test_time_range_parsing() {
        assert_eq!("1h".parse::<TimeRange>(), Ok(TimeRange::OneHour));
        assert_eq!("30d".parse::<TimeRange>(), Ok(TimeRange::ThirtyDays));
        assert!("2w".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::default(), TimeRange::OneDay);
        assert_eq!(TimeRange::SevenDays.duration(), Duration::days(7));
    }

    #[test]
    fn test_time_range_serde_uses_literals() {
        let json = serde_json::to_string(&TimeRange::SixHours).unwrap();
        assert_eq!(json, "\"6h\"");
        let parsed: TimeRange = serde_json::from_str("\"7d\"").unwrap();
        assert_eq!(parsed, TimeRange::SevenDays);
    }

    #[test]
    fn test_aggregate_uptime_and_latency() {
        let records = vec![
            record(HealthStatus::Healthy, Some(100), 30),
            record(HealthStatus::Healthy, Some(200), 20),
            record(HealthStatus::Down, Some(300), 10),
            record(HealthStatus::Unknown, None, 5),
        ];

        let summary =
            MetricsSummary::aggregate(Uuid::nil(), TimeRange::OneHour, HealthStatus::Unknown, records);

        assert_eq!(summary.total_checks, 4);
        assert_eq!(summary.healthy_checks, 2);
        assert_eq!(summary.uptime_percentage, Some(50.0));
        assert_eq!(summary.average_response_time_ms, Some(200.0));
        assert_eq!(summary.records[0].status, HealthStatus::Unknown);
    }

    #[test]
    fn test_aggregate_without_records() {
        let summary =
            MetricsSummary::aggregate(Uuid::nil(), TimeRange::OneDay, HealthStatus::Unknown, vec![]);
        assert_eq!(summary.total_checks, 0);
        assert!(summary.uptime_percentage.is_none());
        assert!(summary.average_response_time_ms.is_none());
    }

    #[test]
    fn test_status_change_summary() {
        let change = StatusChange {
            monitor_id: Uuid::nil(),
            client_id: "acme".to_string(),
            monitor_name: "Payroll".to_string(),
            service_family: ServiceFamily::Keypay,
            previous: HealthStatus::Healthy,
            current: HealthStatus::Down,
            error_message: Some("Server error: 503".to_string()),
            changed_at: Utc::now(),
        };
        assert_eq!(
            change.summary(),
            "[acme] Payroll (KeyPay) changed from healthy to down: Server error: 503"
        );
        assert!(!change.is_recovery());
    }

    #[test]
    fn test_recovery_means_back_to_healthy() {
        let change = |previous, current| StatusChange {
            monitor_id: Uuid::nil(),
            client_id: "acme".to_string(),
            monitor_name: "HR".to_string(),
            service_family: ServiceFamily::Hibob,
            previous,
            current,
            error_message: None,
            changed_at: Utc::now(),
        };

        assert!(change(HealthStatus::Down, HealthStatus::Healthy).is_recovery());
        assert!(change(HealthStatus::Degraded, HealthStatus::Healthy).is_recovery());
        assert!(!change(HealthStatus::Down, HealthStatus::Degraded).is_recovery());
        assert!(!change(HealthStatus::Healthy, HealthStatus::Unknown).is_recovery());
    }

    #[test]
    fn test_monitor_view_hides_credentials() {
        let monitor = IntegrationMonitor {
            id: Uuid::nil(),
            client_id: "acme".to_string(),
            name: "HR".to_string(),
            target: ProbeTarget::new(
                ServiceFamily::Hibob,
                super::super::Credentials::new().with("apiToken", "secret-value"),
            ),
            current_status: HealthStatus::Unknown,
            last_checked_at: None,
            last_error: None,
            created_at: Utc::now(),
        };

        let view = MonitorView::from(&monitor);
        assert_eq!(view.credential_fields, vec!["apiToken".to_string()]);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret-value"));
    }

    #[test]
    fn test_new_monitor_flattens_target() {
        let monitor: NewMonitor = serde_json::from_str(
            r#"{"client_id": "acme", "service_family": "workato", "recipe_ids": ["1"]}"#,
        )
        .unwrap();
        assert_eq!(monitor.client_id, "acme");
        assert_eq!(monitor.target.service_family, ServiceFamily::Workato);
        assert_eq!(monitor.target.recipe_ids, vec!["1".to_string()]);
    }
}
