//! Portal Integration Health
//!
//! Health monitoring for the third-party integrations configured per client
//! (HiBob, KeyPay, Workato).
//!
//! # Design Principles
//! - Total probes: every failure becomes a `ProbeResult`, never an error
//! - One request per probe: no retries, no caching
//! - Side effects (history, metrics, notifications) live outside the probe

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod telemetry;

// Re-export contracts
#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use config::ServiceConfig;
pub use contracts::*;
pub use engine::HealthProber;
pub use error::{MonitorError, Result};
pub use service::MonitoringService;
