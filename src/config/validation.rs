//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require an endpoint for every enabled exporter
//! - Validate addresses, routes and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, on startup and on reload

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::{AgentConfig, OtlpConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: endpoint is required when export is enabled")]
    MissingEndpoint { field: &'static str },

    #[error("{field}: invalid endpoint '{value}': {reason}")]
    InvalidEndpoint {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: route '{value}' must start with '/'")]
    InvalidRoute { field: &'static str, value: String },

    #[error("health: liveness and readiness routes must differ (both '{0}')")]
    SharedRoute(String),

    #[error("health: check_timeout_secs ({check}) must be below request_timeout_secs ({request})")]
    CheckOutlastsRequest { check: u64, request: u64 },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("logging.level: invalid filter '{value}': {reason}")]
    InvalidLogLevel { value: String, reason: String },
}

pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = EnvFilter::try_new(&config.logging.level) {
        errors.push(ValidationError::InvalidLogLevel {
            value: config.logging.level.clone(),
            reason: e.to_string(),
        });
    }

    check_address(&mut errors, "health.bind_address", &config.health.bind_address);
    check_route(&mut errors, "health.liveness_path", &config.health.liveness_path);
    check_route(&mut errors, "health.readiness_path", &config.health.readiness_path);
    if config.health.liveness_path == config.health.readiness_path {
        errors.push(ValidationError::SharedRoute(config.health.liveness_path.clone()));
    }
    check_positive(&mut errors, "health.check_timeout_secs", config.health.check_timeout_secs);
    check_positive(&mut errors, "health.request_timeout_secs", config.health.request_timeout_secs);
    // The request timeout must leave room for the slowest probe to report.
    if config.health.check_timeout_secs >= config.health.request_timeout_secs {
        errors.push(ValidationError::CheckOutlastsRequest {
            check: config.health.check_timeout_secs,
            request: config.health.request_timeout_secs,
        });
    }

    check_exporter(&mut errors, "telemetry.logging", &config.telemetry.logging);
    check_exporter(&mut errors, "telemetry.tracing", &config.telemetry.tracing);
    if config.telemetry.metrics.enabled {
        check_address(
            &mut errors,
            "telemetry.metrics.listen_address",
            &config.telemetry.metrics.listen_address,
        );
    }

    let client = &config.http_client;
    check_positive(&mut errors, "http_client.total_timeout_secs", client.total_timeout_secs);
    check_positive(&mut errors, "http_client.attempt_timeout_secs", client.attempt_timeout_secs);
    check_positive(&mut errors, "http_client.connect_timeout_secs", client.connect_timeout_secs);
    check_positive(&mut errors, "http_client.max_attempts", u64::from(client.max_attempts));
    check_positive(&mut errors, "http_client.failure_threshold", u64::from(client.failure_threshold));

    check_positive(&mut errors, "host.shutdown_timeout_secs", config.host.shutdown_timeout_secs);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_exporter(errors: &mut Vec<ValidationError>, field: &'static str, config: &OtlpConfig) {
    if !config.enabled {
        return;
    }

    match config.endpoint.as_deref() {
        None | Some("") => errors.push(ValidationError::MissingEndpoint { field }),
        Some(endpoint) => match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::InvalidEndpoint {
                field,
                value: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidEndpoint {
                field,
                value: endpoint.to_string(),
                reason: e.to_string(),
            }),
        },
    }

    check_positive(errors, field, config.timeout_secs);
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_route(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::InvalidRoute {
            field,
            value: value.to_string(),
        });
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AgentConfig::default()), Ok(()));
    }

    #[test]
    fn test_enabled_exporter_requires_endpoint() {
        let mut config = AgentConfig::default();
        config.telemetry.tracing.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingEndpoint { field: "telemetry.tracing" }]
        );
    }

    #[test]
    fn test_exporter_endpoint_must_be_http() {
        let mut config = AgentConfig::default();
        config.telemetry.logging.enabled = true;
        config.telemetry.logging.endpoint = Some("ftp://collector/v1/logs".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidEndpoint { field: "telemetry.logging", .. }
        ));
    }

    #[test]
    fn test_disabled_exporter_is_not_checked() {
        let mut config = AgentConfig::default();
        config.telemetry.logging.endpoint = Some("not a url".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AgentConfig::default();
        config.health.bind_address = "nowhere".into();
        config.health.readiness_path = "ready".into();
        config.http_client.max_attempts = 0;
        config.logging.level = "agent=loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn test_routes_must_differ() {
        let mut config = AgentConfig::default();
        config.health.readiness_path = config.health.liveness_path.clone();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SharedRoute("/health".into())]);
    }

    #[test]
    fn test_check_timeout_must_fit_request_timeout() {
        let mut config = AgentConfig::default();
        config.health.check_timeout_secs = 2;
        config.health.request_timeout_secs = 1;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CheckOutlastsRequest { check: 2, request: 1 }]
        );

        config.health.request_timeout_secs = 2;
        assert!(validate_config(&config).is_err());

        config.health.request_timeout_secs = 3;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
