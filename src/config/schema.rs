//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Reserved backend name that resolves to the identity provider's domain.
pub const IDENTITY_BACKEND: &str = "identity";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend service definitions.
    pub backends: Vec<BackendConfig>,

    /// Identity provider settings.
    pub identity: IdentityConfig,

    /// Route definitions mapping inbound paths to backends.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate-limit annotation settings.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: vec![
                BackendConfig {
                    name: "warehouse".to_string(),
                    base_url: "http://localhost:5001".to_string(),
                },
                BackendConfig {
                    name: "sales".to_string(),
                    base_url: "http://localhost:5002".to_string(),
                },
            ],
            identity: IdentityConfig::default(),
            routes: default_routes(),
            timeouts: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "warehouse".to_string(),
            path: "/warehouse".to_string(),
            methods: vec!["GET".to_string()],
            backend: "warehouse".to_string(),
            backend_path: None,
            require_authorization: false,
            required_scopes: Vec::new(),
        },
        RouteConfig {
            name: "sales-sku".to_string(),
            path: "/sales/sku/{sku}".to_string(),
            methods: vec!["GET".to_string()],
            backend: "sales".to_string(),
            backend_path: Some("/sku/{sku}".to_string()),
            require_authorization: true,
            required_scopes: Vec::new(),
        },
        RouteConfig {
            name: "token".to_string(),
            path: "/token".to_string(),
            methods: vec!["POST".to_string()],
            backend: IDENTITY_BACKEND.to_string(),
            backend_path: Some("/oauth/token".to_string()),
            require_authorization: false,
            required_scopes: Vec::new(),
        },
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A backend service the gateway forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier, referenced by routes.
    pub name: String,

    /// Base URL (e.g., "http://sales:80"). Path components are kept as a prefix.
    pub base_url: String,
}

/// External OAuth2 identity provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Provider base URL. Routes naming the `identity` backend forward here.
    pub domain: String,

    /// Expected token audience. Unchecked when absent.
    pub audience: Option<String>,

    /// Token introspection endpoint path (RFC 7662).
    pub introspection_path: String,

    /// Client credentials presented to the introspection endpoint.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Introspection request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain: "http://localhost:5003".to_string(),
            audience: None,
            introspection_path: "/oauth/introspect".to_string(),
            client_id: None,
            client_secret: None,
            timeout_secs: 5,
        }
    }
}

/// Route configuration mapping an inbound path to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Inbound path pattern, e.g. "/sales/sku/{sku}".
    pub path: String,

    /// Accepted methods. Empty accepts any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Backend name, or `identity` for the identity provider.
    pub backend: String,

    /// Backend path template. Defaults to the inbound pattern.
    #[serde(default)]
    pub backend_path: Option<String>,

    /// Reject requests without a valid bearer token.
    #[serde(default)]
    pub require_authorization: bool,

    /// Scopes the token must carry (only checked when authorization is required).
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for a backend to return response headers, in seconds.
    pub upstream_secs: u64,

    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Rate-limit annotation. The gateway announces the policy; it does not enforce it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Response header carrying the policy.
    pub header_name: String,

    /// Announced policy value.
    pub policy: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            header_name: "X-RateLimit-Limit".to_string(),
            policy: "unlimited".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_falls_back_to_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.rate_limit.policy, "unlimited");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn routes_section_replaces_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[routes]]
            name = "orders"
            path = "/orders/{id}"
            backend = "sales"
            require_authorization = true
            required_scopes = ["read:orders"]
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 1);
        let route = &config.routes[0];
        assert!(route.methods.is_empty());
        assert!(route.backend_path.is_none());
        assert_eq!(route.required_scopes, vec!["read:orders".to_string()]);
    }
}
