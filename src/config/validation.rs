//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, caps ordered, addresses parse)
//! - Refuse the placeholder credential
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{GateConfig, PLACEHOLDER_API_KEY};

const MIN_FILENAME_LEN: usize = 16;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and collect the violations.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.api_key.trim().is_empty() {
        errors.push(ValidationError::new("auth.api_key", "must not be empty"));
    } else if config.auth.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::new(
            "auth.api_key",
            "placeholder key must be replaced",
        ));
    }

    if config.auth.header_name.trim().is_empty() {
        errors.push(ValidationError::new("auth.header_name", "must not be empty"));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be positive"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be positive"));
    }

    if config.lockout.horizon_secs == 0 {
        errors.push(ValidationError::new("lockout.horizon_secs", "must be positive"));
    }
    if config.lockout.max_failures == 0 {
        errors.push(ValidationError::new("lockout.max_failures", "must be positive"));
    }

    let uploads = &config.uploads;
    if uploads.max_file_bytes == 0 {
        errors.push(ValidationError::new("uploads.max_file_bytes", "must be positive"));
    }
    if uploads.max_file_bytes > uploads.max_aggregate_bytes {
        errors.push(ValidationError::new(
            "uploads.max_aggregate_bytes",
            "must be at least max_file_bytes",
        ));
    }
    if uploads.max_files == 0 {
        errors.push(ValidationError::new("uploads.max_files", "must be at least 1"));
    }
    if uploads.max_filename_len < MIN_FILENAME_LEN {
        errors.push(ValidationError::new(
            "uploads.max_filename_len",
            format!("must be at least {MIN_FILENAME_LEN}"),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be positive"));
    }
    if config.maintenance.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "maintenance.sweep_interval_secs",
            "must be positive",
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
