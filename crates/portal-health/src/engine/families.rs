//! Built-in service family profiles
//!
//! Endpoints, timeouts and auth schemes for HiBob, KeyPay and Workato.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;

use super::{BodyVerdict, CredentialError, FamilyProfile, DEFAULT_TIMEOUT, WORKATO_TIMEOUT};
use crate::contracts::*;

pub const HIBOB_DEFAULT_ENDPOINT: &str = "https://api.hibob.com/v1/company/named-lists";
pub const KEYPAY_DEFAULT_ENDPOINT: &str = "https://api.yourpayroll.com.au/api/v2/business";
pub const WORKATO_DEFAULT_ENDPOINT: &str = "https://www.workato.com/api/recipes";

const TOKEN_KEYS: &[&str] = &["apiToken", "api_token", "token"];
const KEY_KEYS: &[&str] = &["apiKey", "api_key"];
const EMAIL_KEYS: &[&str] = &["email"];

/// Profile shipped for `family`
pub fn builtin_profile(family: ServiceFamily) -> FamilyProfile {
    match family {
        ServiceFamily::Hibob => FamilyProfile {
            family,
            default_endpoint: HIBOB_DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            auth_headers: hibob_headers,
            body_classifier: None,
        },
        ServiceFamily::Keypay => FamilyProfile {
            family,
            default_endpoint: KEYPAY_DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            auth_headers: keypay_headers,
            body_classifier: None,
        },
        ServiceFamily::Workato => FamilyProfile {
            family,
            default_endpoint: WORKATO_DEFAULT_ENDPOINT.to_string(),
            timeout: WORKATO_TIMEOUT,
            auth_headers: workato_headers,
            body_classifier: Some(workato_recipes),
        },
    }
}

fn header_value(value: String, field: &str) -> Result<HeaderValue, CredentialError> {
    HeaderValue::from_str(&value)
        .map_err(|_| CredentialError::Invalid(format!("{} contains characters not allowed in a header", field)))
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// HiBob service tokens go out as basic credentials
fn hibob_headers(credentials: &Credentials) -> Result<HeaderMap, CredentialError> {
    let token = credentials
        .lookup(TOKEN_KEYS)
        .ok_or_else(|| CredentialError::Missing("HiBob API token not configured".to_string()))?;

    let mut headers = base_headers();
    headers.insert(
        AUTHORIZATION,
        header_value(format!("Basic {}", STANDARD.encode(token)), "HiBob API token")?,
    );
    Ok(headers)
}

/// KeyPay uses the API key as the basic-auth user with an empty password
fn keypay_headers(credentials: &Credentials) -> Result<HeaderMap, CredentialError> {
    let key = credentials
        .lookup(KEY_KEYS)
        .ok_or_else(|| CredentialError::Missing("KeyPay API key not configured".to_string()))?;

    let mut headers = base_headers();
    headers.insert(
        AUTHORIZATION,
        header_value(
            format!("Basic {}", STANDARD.encode(format!("{}:", key))),
            "KeyPay API key",
        )?,
    );
    Ok(headers)
}

fn workato_headers(credentials: &Credentials) -> Result<HeaderMap, CredentialError> {
    let token = credentials
        .lookup(TOKEN_KEYS)
        .ok_or_else(|| CredentialError::Missing("Workato API token not configured".to_string()))?;

    let mut headers = base_headers();
    headers.insert(
        AUTHORIZATION,
        header_value(format!("Bearer {}", token), "Workato API token")?,
    );

    // Legacy workspaces still authenticate with email + token headers
    if let Some(email) = credentials.lookup(EMAIL_KEYS) {
        headers.insert(
            HeaderName::from_static("x-user-email"),
            header_value(email.to_string(), "Workato email")?,
        );
        headers.insert(
            HeaderName::from_static("x-user-token"),
            header_value(token.to_string(), "Workato API token")?,
        );
    }

    Ok(headers)
}

fn recipe_id(recipe: &Value) -> Option<String> {
    match recipe.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Pick the requested recipes out of a Workato listing.
///
/// Accepts a bare array or an object with an `items` array.
pub fn workato_recipes(body: &Value, requested: &[String]) -> BodyVerdict {
    let listing: &[Value] = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let recipes: Vec<RecipeStatus> = listing
        .iter()
        .filter_map(|recipe| {
            let id = recipe_id(recipe)?;
            if !requested.iter().any(|wanted| *wanted == id) {
                return None;
            }
            let running = recipe.get("running").and_then(Value::as_bool).unwrap_or(false);
            Some(RecipeStatus {
                recipe_id: id,
                running_status: RunningStatus::from(running),
                last_run_at: parse_timestamp(recipe.get("last_run_at")),
            })
        })
        .collect();

    let stopped: Vec<&str> = recipes
        .iter()
        .filter(|r| r.running_status == RunningStatus::Stopped)
        .map(|r| r.recipe_id.as_str())
        .collect();

    let degraded_reason = if stopped.is_empty() {
        None
    } else {
        Some(format!("Stopped recipes: {}", stopped.join(", ")))
    };

    BodyVerdict {
        recipes,
        degraded_reason,
    }
}
