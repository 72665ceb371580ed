//! Health probe engine
//!
//! One generic prober driven by per-family profiles. A probe sends exactly
//! one GET request and always yields a `ProbeResult`.

mod families;

pub use families::*;

use crate::contracts::*;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Timeout for HiBob and KeyPay probes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Workato answers noticeably slower
pub const WORKATO_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a credential bundle could not be turned into auth headers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Required field absent; the probe reports `unknown`
    #[error("{0}")]
    Missing(String),

    /// Present but unusable in a header; the probe reports `down`
    #[error("{0}")]
    Invalid(String),
}

/// Outcome of inspecting a success body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyVerdict {
    pub recipes: Vec<RecipeStatus>,
    pub degraded_reason: Option<String>,
}

pub type AuthHeaderBuilder = fn(&Credentials) -> Result<HeaderMap, CredentialError>;
pub type BodyClassifier = fn(&Value, &[String]) -> BodyVerdict;

/// Everything that differs between service families
#[derive(Clone)]
pub struct FamilyProfile {
    pub family: ServiceFamily,
    pub default_endpoint: String,
    pub timeout: Duration,
    pub auth_headers: AuthHeaderBuilder,
    /// Runs on 2xx bodies when the target names recipes
    pub body_classifier: Option<BodyClassifier>,
}

impl FamilyProfile {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.default_endpoint = endpoint.into();
        self
    }
}

impl std::fmt::Debug for FamilyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyProfile")
            .field("family", &self.family)
            .field("default_endpoint", &self.default_endpoint)
            .field("timeout", &self.timeout)
            .field("body_classifier", &self.body_classifier.is_some())
            .finish()
    }
}

/// Classification of an HTTP status, before any body inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusVerdict {
    Success,
    Degraded(String),
    Down(String),
}

/// Map a response status to a verdict.
///
/// Precedence: auth failures, server errors, rate limiting, success, then
/// everything else as degraded.
pub fn classify_status(family: ServiceFamily, status: StatusCode) -> StatusVerdict {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Unknown");

    if code == 401 || code == 403 {
        StatusVerdict::Down(format!(
            "Authentication failed ({} {}): check {} API credentials",
            code,
            reason,
            family.display_name()
        ))
    } else if code >= 500 {
        StatusVerdict::Down(format!("Server error: {} {}", code, reason))
    } else if code == 429 {
        StatusVerdict::Degraded(format!(
            "Rate limited by {} API (429 Too Many Requests)",
            family.display_name()
        ))
    } else if status.is_success() {
        StatusVerdict::Success
    } else {
        StatusVerdict::Degraded(format!("Unexpected response: {} {}", code, reason))
    }
}

/// Describe a transport failure; connection and DNS problems get a fixed prefix
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        format!("Network error: DNS lookup or connection failed ({})", err)
    } else {
        let text = err.to_string();
        if text.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            text
        }
    }
}

fn timeout_message(limit: Duration) -> String {
    format!("Request timed out after {}ms", limit.as_millis())
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Integration health prober
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: reqwest::Client,
    profiles: HashMap<ServiceFamily, FamilyProfile>,
}

impl Default for HealthProber {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthProber {
    /// Create prober with the built-in family profiles
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create prober sharing an existing connection pool
    pub fn with_client(client: reqwest::Client) -> Self {
        let profiles = ServiceFamily::ALL
            .iter()
            .map(|family| (*family, builtin_profile(*family)))
            .collect();
        Self { client, profiles }
    }

    /// Replace the profile of one family
    pub fn with_profile(mut self, profile: FamilyProfile) -> Self {
        self.profiles.insert(profile.family, profile);
        self
    }

    pub fn profile(&self, family: ServiceFamily) -> FamilyProfile {
        self.profiles
            .get(&family)
            .cloned()
            .unwrap_or_else(|| builtin_profile(family))
    }

    /// Probe a target once
    pub async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        let profile = self.profile(target.service_family);
        self.probe_with(&profile, target).await
    }

    async fn probe_with(&self, profile: &FamilyProfile, target: &ProbeTarget) -> ProbeResult {
        let start = Instant::now();

        let headers = match (profile.auth_headers)(&target.credentials) {
            Ok(headers) => headers,
            Err(CredentialError::Missing(reason)) => {
                tracing::debug!(family = %profile.family, "Skipping probe: {}", reason);
                return ProbeResult::unknown(reason);
            }
            Err(CredentialError::Invalid(reason)) => {
                return ProbeResult::down(elapsed_ms(start), reason);
            }
        };

        let endpoint = target
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(profile.default_endpoint.as_str());

        tracing::debug!(
            family = %profile.family,
            endpoint = %endpoint,
            credentials = %target.credentials.fingerprint(),
            "Probing integration"
        );

        let wants_body = profile.body_classifier.is_some() && !target.recipe_ids.is_empty();
        let request = self.client.get(endpoint).headers(headers);

        let exchange = async move {
            let response = request.send().await?;
            let status = response.status();
            let body = if wants_body && status.is_success() {
                Some(response.bytes().await?)
            } else {
                None
            };
            Ok::<_, reqwest::Error>((status, body))
        };

        let outcome = timeout(profile.timeout, exchange).await;
        let latency = elapsed_ms(start);

        let (status, body) = match outcome {
            Err(_) => return ProbeResult::down(latency, timeout_message(profile.timeout)),
            Ok(Err(e)) if e.is_timeout() => {
                return ProbeResult::down(latency, timeout_message(profile.timeout))
            }
            Ok(Err(e)) => return ProbeResult::down(latency, describe_transport_error(&e)),
            Ok(Ok(exchange)) => exchange,
        };

        match classify_status(profile.family, status) {
            StatusVerdict::Down(reason) => ProbeResult::down(latency, reason),
            StatusVerdict::Degraded(reason) => ProbeResult::degraded(latency, reason),
            StatusVerdict::Success => match (profile.body_classifier, body) {
                (Some(classifier), Some(bytes)) => {
                    let json: Value = match serde_json::from_slice(&bytes) {
                        Ok(json) => json,
                        Err(e) => {
                            return ProbeResult::degraded(
                                latency,
                                format!("Unable to parse recipe listing: {}", e),
                            )
                        }
                    };
                    let verdict = classifier(&json, &target.recipe_ids);
                    let result = match verdict.degraded_reason {
                        Some(reason) => ProbeResult::degraded(latency, reason),
                        None => ProbeResult::healthy(latency),
                    };
                    result.with_recipes(verdict.recipes)
                }
                _ => ProbeResult::healthy(latency),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_auth_failures() {
        for code in [401u16, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            match classify_status(ServiceFamily::Hibob, status) {
                StatusVerdict::Down(msg) => assert!(msg.contains("Authentication failed")),
                other => panic!("unexpected verdict {:?}", other),
            }
        }
    }

    #[test]
    fn test_classify_nonstandard_high_codes_as_down() {
        let status = StatusCode::from_u16(600).unwrap();
        assert_eq!(
            classify_status(ServiceFamily::Hibob, status),
            StatusVerdict::Down("Server error: 600 Unknown".to_string())
        );
    }

    #[test]
    fn test_classify_rate_limit_and_other() {
        assert!(matches!(
            classify_status(ServiceFamily::Keypay, StatusCode::TOO_MANY_REQUESTS),
            StatusVerdict::Degraded(msg) if msg.contains("Rate limited")
        ));
        assert!(matches!(
            classify_status(ServiceFamily::Keypay, StatusCode::NOT_FOUND),
            StatusVerdict::Degraded(msg) if msg == "Unexpected response: 404 Not Found"
        ));
        assert_eq!(
            classify_status(ServiceFamily::Workato, StatusCode::NO_CONTENT),
            StatusVerdict::Success
        );
    }

    #[test]
    fn test_builtin_timeouts() {
        let prober = HealthProber::new();
        assert_eq!(prober.profile(ServiceFamily::Hibob).timeout, DEFAULT_TIMEOUT);
        assert_eq!(prober.profile(ServiceFamily::Keypay).timeout, DEFAULT_TIMEOUT);
        assert_eq!(prober.profile(ServiceFamily::Workato).timeout, WORKATO_TIMEOUT);
    }

    #[test]
    fn test_profile_override() {
        let profile = builtin_profile(ServiceFamily::Hibob).with_timeout(Duration::from_millis(50));
        let prober = HealthProber::new().with_profile(profile);
        assert_eq!(
            prober.profile(ServiceFamily::Hibob).timeout,
            Duration::from_millis(50)
        );
        assert_eq!(prober.profile(ServiceFamily::Keypay).timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_unknown() {
        let prober = HealthProber::new();
        for family in ServiceFamily::ALL {
            let result = prober.probe(&ProbeTarget::new(family, Credentials::new())).await;
            assert_eq!(result.status, HealthStatus::Unknown);
            assert!(result.response_time_ms.is_none());
            assert!(result.error_message.is_some());
        }
    }

    proptest! {
        #[test]
        fn prop_server_errors_are_down(code in 500u16..1000) {
            let status = StatusCode::from_u16(code).unwrap();
            match classify_status(ServiceFamily::Hibob, status) {
                StatusVerdict::Down(msg) => prop_assert!(msg.contains(&code.to_string())),
                other => prop_assert!(false, "unexpected verdict {:?}", other),
            }
        }

        #[test]
        fn prop_success_codes_are_success(code in 200u16..300) {
            let status = StatusCode::from_u16(code).unwrap();
            prop_assert_eq!(classify_status(ServiceFamily::Keypay, status), StatusVerdict::Success);
        }

        #[test]
        fn prop_client_errors_never_healthy(code in 400u16..500) {
            let status = StatusCode::from_u16(code).unwrap();
            let verdict = classify_status(ServiceFamily::Workato, status);
            prop_assert_ne!(verdict, StatusVerdict::Success);
        }
    }
}
