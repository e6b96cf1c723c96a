//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Bind addresses parse, the access-log pattern compiles, the sink is named
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `&ServerConfig → Result<(), Vec<ValidationError>>`

use std::net::SocketAddr;

use thiserror::Error;

use crate::access_log::{CompiledTemplate, PatternError};
use crate::config::schema::ServerConfig;

/// One semantic problem in a configuration file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("access_log.pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("access_log.sink must not be empty")]
    EmptySink,

    #[error("observability.log_format: expected \"pretty\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),

    #[error("admin.api_key must not be empty when the admin API is enabled")]
    EmptyApiKey,
}

/// Check everything serde cannot.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "api.bind_address", &config.api.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if let Err(e) = CompiledTemplate::compile(config.access_log.pattern_source()) {
        errors.push(e.into());
    }
    if config.access_log.sink.trim().is_empty() {
        errors.push(ValidationError::EmptySink);
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::InvalidLogFormat(other.to_string())),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = ServerConfig::default();
        config.api.bind_address = "not-an-address".to_string();
        config.admin.api_key.clear();
        config.access_log.pattern = "%{Host".to_string();
        config.access_log.sink = "  ".to_string();
        config.observability.log_format = "xml".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "api.bind_address",
                    value: "not-an-address".to_string(),
                },
                ValidationError::EmptyApiKey,
                ValidationError::InvalidPattern(PatternError::Unterminated(0)),
                ValidationError::EmptySink,
                ValidationError::InvalidLogFormat("xml".to_string()),
            ]
        );
    }

    #[test]
    fn test_disabled_admin_skips_admin_checks() {
        let mut config = ServerConfig::default();
        config.admin.enabled = false;
        config.admin.bind_address = "nowhere".to_string();
        config.admin.api_key.clear();
        assert!(validate_config(&config).is_ok());
    }
}
