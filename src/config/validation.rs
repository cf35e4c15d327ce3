//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts ≥ 1, timeouts > 0, status codes valid)
//! - Check the endpoint is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResourceManagerConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::ResourceManagerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint '{0}' is not a valid http(s) URL")]
    InvalidEndpoint(String),

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffInverted { base: u64, max: u64 },

    #[error("retries.retryable_codes contains invalid status code {0}")]
    InvalidStatusCode(u16),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ResourceManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidEndpoint(config.endpoint.clone())),
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::BackoffInverted {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }
    for &code in &retries.retryable_codes {
        if !(100..=599).contains(&code) {
            errors.push(ValidationError::InvalidStatusCode(code));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ResourceManagerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ResourceManagerConfig::default();
        config.endpoint = "ftp://example.com".to_string();
        config.retries.max_attempts = 0;
        config.retries.base_delay_ms = 5000;
        config.retries.retryable_codes.push(42);
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroAttempts));
        assert!(errors.contains(&ValidationError::InvalidStatusCode(42)));
        assert!(errors.contains(&ValidationError::ZeroTimeout("request_secs")));
    }
}
