//! Configuration schema definitions.
//!
//! This module defines the settings of the deployment service itself.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the deployment service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeployerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Live store and staging locations.
    pub store: StoreConfig,

    /// External validator invocation.
    pub validator: ValidatorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Live store watcher settings.
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8090".to_string(),
        }
    }
}

/// Where live configuration lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the recognized documents.
    pub config_dir: PathBuf,

    /// Base location for override files and relative validate targets.
    pub base_dir: PathBuf,

    /// Parent for staging directories (system temp dir when unset).
    pub staging_root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            base_dir: PathBuf::from("."),
            staging_root: None,
        }
    }
}

/// External validator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Program to run when the interpreter variable is unset.
    pub program: PathBuf,

    /// Environment variable that, when set, replaces `program`.
    pub interpreter_env: String,

    /// Arguments placed before the directory path.
    pub args: Vec<String>,

    /// Maximum run time in seconds before the report is marked invalid.
    pub timeout_secs: u64,
}

impl ValidatorConfig {
    /// Program path after applying the interpreter environment override.
    pub fn resolve_program(&self) -> PathBuf {
        self.resolve_program_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn resolve_program_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.interpreter_env.is_empty() {
            return self.program.clone();
        }
        match lookup(&self.interpreter_env) {
            Some(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => self.program.clone(),
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            interpreter_env: "CONFIG_VALIDATOR_INTERPRETER".to_string(),
            args: vec!["scripts/validate_config.py".to_string()],
            timeout_secs: 30,
        }
    }
}

/// Timeout configuration for HTTP handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

/// Live store watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Re-validate the live store when its files change.
    pub enabled: bool,

    /// Poll interval for backends that need one, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_secs: 2,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
