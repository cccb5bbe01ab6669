//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing backends)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate backend and route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, IDENTITY_BACKEND};
use crate::routing::router::{backend_targets, normalize_base_url, Route, RouteError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("backend name `{0}` is reserved for the identity provider")]
    ReservedBackendName(String),

    #[error("identity.domain: {0}")]
    InvalidIdentityDomain(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("rate_limit: invalid header `{name}: {value}`")]
    InvalidRateLimitHeader { name: String, value: String },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let mut backend_names = HashSet::new();
    for backend in &config.backends {
        if backend.name == IDENTITY_BACKEND {
            errors.push(ValidationError::ReservedBackendName(backend.name.clone()));
        }
        if !backend_names.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateName {
                kind: "backend",
                name: backend.name.clone(),
            });
        }
        if let Err(e) = normalize_base_url(&backend.name, &backend.base_url) {
            errors.push(e.into());
        }
    }

    // Checked even when no route forwards to the identity provider, since
    // introspection still calls it.
    match Url::parse(&config.identity.domain) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidIdentityDomain(format!(
            "unsupported scheme `{}`",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::InvalidIdentityDomain(e.to_string())),
    }

    let targets = backend_targets(config);
    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateName {
                kind: "route",
                name: route.name.clone(),
            });
        }
        if let Err(e) = Route::from_config(route, &targets) {
            errors.push(e.into());
        }
    }

    let rate_limit = &config.rate_limit;
    if HeaderName::from_bytes(rate_limit.header_name.as_bytes()).is_err()
        || HeaderValue::from_str(&rate_limit.policy).is_err()
    {
        errors.push(ValidationError::InvalidRateLimitHeader {
            name: rate_limit.header_name.clone(),
            value: rate_limit.policy.clone(),
        });
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
    use crate::config::schema::BackendConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.upstream_secs = 0;
        config.backends.push(BackendConfig {
            name: "sales".into(),
            base_url: "ftp://sales".into(),
        });
        config.routes[1].backend = "missing".into();
        config.rate_limit.header_name = "bad header".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6, "{errors:?}");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateName { kind: "backend", .. })));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Route(RouteError::UnknownBackend { .. })
        )));
    }

    #[test]
    fn identity_name_is_reserved() {
        let mut config = GatewayConfig::default();
        config.backends.push(BackendConfig {
            name: IDENTITY_BACKEND.into(),
            base_url: "http://idp".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::ReservedBackendName(_)));
    }

    #[test]
    fn https_identity_is_a_valid_forwarding_target() {
        let mut config = GatewayConfig::default();
        config.identity.domain = "https://tenant.example.com".into();
        assert!(config.routes.iter().any(|r| r.backend == IDENTITY_BACKEND));
        assert!(validate_config(&config).is_ok());

        config.identity.domain = "ftp://tenant.example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidIdentityDomain(_))));
    }
}
