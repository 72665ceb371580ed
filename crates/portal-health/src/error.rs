//! Error types for the monitoring service
//!
//! Probes never fail; these cover registry lookups, input handling and I/O.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for monitoring operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// No monitor with this id
    #[error("Monitor not found: {0}")]
    NotFound(Uuid),

    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Monitor file parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    Io(String),

    /// Outbound HTTP error (webhooks, API client)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl MonitorError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        MonitorError::InvalidInput(msg.into())
    }

    /// Check if this is a caller error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MonitorError::NotFound(_) | MonitorError::InvalidInput(_) | MonitorError::Parse(_)
        )
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Parse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(err: serde_yaml::Error) -> Self {
        MonitorError::Parse(format!("YAML error: {}", err))
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err.to_string())
    }
}

/// Result type alias for monitoring operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::NotFound(Uuid::nil());
        assert_eq!(
            err.to_string(),
            "Monitor not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_is_user_error() {
        assert!(MonitorError::invalid_input("bad range").is_user_error());
        assert!(MonitorError::NotFound(Uuid::nil()).is_user_error());
        assert!(!MonitorError::Http("refused".to_string()).is_user_error());
    }

    #[test]
    fn test_yaml_error_conversion() {
        let err: MonitorError = serde_yaml::from_str::<Vec<String>>("{").unwrap_err().into();
        assert!(matches!(err, MonitorError::Parse(msg) if msg.starts_with("YAML error")));
    }
}
