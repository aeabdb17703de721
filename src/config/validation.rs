//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that deserialize fine but
//! cannot work at runtime (unparseable addresses, zero timeouts, non-HTTP
//! endpoints). All problems are reported together, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_positive(&mut errors, "timeouts.connect_secs", config.timeouts.connect_secs);
    check_positive(
        &mut errors,
        "timeouts.upstream_headers_secs",
        config.timeouts.upstream_headers_secs,
    );
    check_positive(&mut errors, "timeouts.idle_secs", config.timeouts.idle_secs);
    check_positive(
        &mut errors,
        "timeouts.shutdown_grace_secs",
        config.timeouts.shutdown_grace_secs,
    );
    check_positive(&mut errors, "lookup.timeout_secs", config.lookup.timeout_secs);
    check_positive(&mut errors, "upload.timeout_secs", config.upload.timeout_secs);
    check_positive(
        &mut errors,
        "upload.max_body_bytes",
        config.upload.max_body_bytes as u64,
    );

    check_endpoint(&mut errors, "lookup.endpoint", &config.lookup.endpoint);
    check_endpoint(&mut errors, "upload.endpoint", &config.upload.endpoint);

    if config.download.default_title.trim().is_empty() {
        errors.push(ValidationError::new("download.default_title", "must not be empty"));
    }
    if config.download.default_ext.trim().is_empty() {
        errors.push(ValidationError::new("download.default_ext", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("invalid socket address {:?}: {}", value, e)));
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

fn check_endpoint(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
