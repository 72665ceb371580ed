//! Probe targets and credential bundles
//!
//! Defines the external services that can be probed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Supported third-party service families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFamily {
    /// HiBob HR platform
    Hibob,
    /// KeyPay payroll
    Keypay,
    /// Workato automation
    Workato,
}

impl ServiceFamily {
    pub const ALL: [ServiceFamily; 3] = [
        ServiceFamily::Hibob,
        ServiceFamily::Keypay,
        ServiceFamily::Workato,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceFamily::Hibob => "hibob",
            ServiceFamily::Keypay => "keypay",
            ServiceFamily::Workato => "workato",
        }
    }

    /// Display name used in diagnostic messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceFamily::Hibob => "HiBob",
            ServiceFamily::Keypay => "KeyPay",
            ServiceFamily::Workato => "Workato",
        }
    }
}

impl fmt::Display for ServiceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hibob" => Ok(ServiceFamily::Hibob),
            "keypay" => Ok(ServiceFamily::Keypay),
            "workato" => Ok(ServiceFamily::Workato),
            other => Err(format!("Unknown service family: {}", other)),
        }
    }
}

/// Free-form credential bundle as stored on a monitor record
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Value::String(value.into()));
        self
    }

    /// First non-blank string value among `keys`
    pub fn lookup(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names, sorted
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Short, stable digest of the bundle for log correlation
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.0 {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())[..12].to_string()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|key| (key, "<redacted>")))
            .finish()
    }
}

impl From<Map<String, Value>> for Credentials {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// What to probe and how to authenticate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Service family, selects the probe profile
    pub service_family: ServiceFamily,

    /// Endpoint override; the family default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Credential bundle
    #[serde(default)]
    pub credentials: Credentials,

    /// Workato recipe identifiers to report on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipe_ids: Vec<String>,
}

impl ProbeTarget {
    pub fn new(service_family: ServiceFamily, credentials: Credentials) -> Self {
        Self {
            service_family,
            endpoint: None,
            credentials,
            recipe_ids: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_recipes<I, S>(mut self, recipe_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipe_ids = recipe_ids.into_iter().map(Into::into).collect();
        self
    }
}
