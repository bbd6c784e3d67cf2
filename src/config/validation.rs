//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check the image route is a usable path prefix
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Rates are clamped rather than rejected
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_host `{0}` is not an IP address")]
    BindHost(String),
    #[error("viewer.image_route `{0}` must start with '/' and contain only visible ASCII without quotes, '<', '>' or '\\'")]
    ImageRoute(String),
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// The route is embedded in the viewer page script, so it must be inert there.
fn is_route_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | '\'' | '<' | '>' | '\\')
}

/// Check every field that serde alone cannot.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindHost(config.listener.bind_host.clone()));
    }

    let route = &config.viewer.image_route;
    if !route.starts_with('/') || !route.chars().all(is_route_char) {
        errors.push(ValidationError::ImageRoute(route.clone()));
    }

    let limits = &config.limits;
    if limits.max_request_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_request_bytes"));
    }
    if limits.read_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLimit("read_timeout_ms"));
    }
    if limits.write_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLimit("write_timeout_ms"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
