//! Integration Health Contracts
//!
//! Types shared between the probe engine, the monitor registry, the HTTP
//! API and its client.

mod monitors;
mod targets;

pub use monitors::*;
pub use targets::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Probe completed with a success response
    Healthy,
    /// Reachable but rate limited, partially stopped or answering oddly
    Degraded,
    /// Unreachable, timed out, rejected credentials or failing server side
    Down,
    /// Not probed: required credentials are missing
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single probe.
///
/// Build it through the constructors; they keep `response_time_ms` and
/// `error_message` consistent with `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Classified status
    pub status: HealthStatus,

    /// Round trip in milliseconds, absent when no request was sent
    pub response_time_ms: Option<u64>,

    /// Diagnostic message, absent only when healthy
    pub error_message: Option<String>,

    /// Requested Workato recipes found in the listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_statuses: Option<Vec<RecipeStatus>>,
}

impl ProbeResult {
    /// Create healthy result
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            response_time_ms: Some(response_time_ms),
            error_message: None,
            recipe_statuses: None,
        }
    }

    /// Create degraded result
    pub fn degraded(response_time_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            response_time_ms: Some(response_time_ms),
            error_message: Some(reason.into()),
            recipe_statuses: None,
        }
    }

    /// Create down result
    pub fn down(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            response_time_ms: Some(response_time_ms),
            error_message: Some(error.into()),
            recipe_statuses: None,
        }
    }

    /// Create unknown result; no request was attempted
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unknown,
            response_time_ms: None,
            error_message: Some(reason.into()),
            recipe_statuses: None,
        }
    }

    /// Attach recipe statuses, dropping an empty list
    pub fn with_recipes(mut self, recipes: Vec<RecipeStatus>) -> Self {
        self.recipe_statuses = if recipes.is_empty() {
            None
        } else {
            Some(recipes)
        };
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Running state of a Workato recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningStatus {
    Running,
    Stopped,
}

impl From<bool> for RunningStatus {
    fn from(running: bool) -> Self {
        if running {
            RunningStatus::Running
        } else {
            RunningStatus::Stopped
        }
    }
}

/// State of one requested Workato recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStatus {
    pub recipe_id: String,
    pub running_status: RunningStatus,
    pub last_run_at: Option<DateTime<Utc>>,
}
