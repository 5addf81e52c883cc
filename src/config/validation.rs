//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that the validator finishes before the HTTP request times out
//! - Keep override files out of the document directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeployerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use crate::config::schema::DeployerConfig;
use crate::deploy::store::same_location;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("validator.timeout_secs ({validator}) must be shorter than timeouts.request_secs ({request})")]
    ValidatorOutlivesRequest { validator: u64, request: u64 },

    #[error("store.config_dir and store.base_dir must be different directories")]
    StoreSharesBase,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &DeployerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.store.config_dir.as_os_str().is_empty() {
        errors.push(ValidationError::Empty("store.config_dir"));
    }
    if same_location(&config.store.config_dir, &config.store.base_dir) {
        errors.push(ValidationError::StoreSharesBase);
    }
    if config.validator.program.as_os_str().is_empty() {
        errors.push(ValidationError::Empty("validator.program"));
    }

    let validator_secs = config.validator.timeout_secs;
    let request_secs = config.timeouts.request_secs;
    if validator_secs == 0 {
        errors.push(ValidationError::Zero("validator.timeout_secs"));
    }
    if request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if validator_secs > 0 && request_secs > 0 && validator_secs >= request_secs {
        errors.push(ValidationError::ValidatorOutlivesRequest {
            validator: validator_secs,
            request: request_secs,
        });
    }

    if config.watcher.enabled && config.watcher.poll_interval_secs == 0 {
        errors.push(ValidationError::Zero("watcher.poll_interval_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
