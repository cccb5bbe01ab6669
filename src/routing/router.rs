//! Route lookup.
//!
//! # Responsibilities
//! - Compile route definitions against the configured backends
//! - Look up the matching route for a method and path
//! - Build the backend target URI for a match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in configuration order; first match wins
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;

use axum::http::{Method, Uri};
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig, IDENTITY_BACKEND};
use crate::routing::matcher::{PathParams, PathPattern, PatternError};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{route}`: {source}")]
    Pattern {
        route: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{route}` references unknown backend `{backend}`")]
    UnknownBackend { route: String, backend: String },

    #[error("route `{route}` has invalid method `{method}`")]
    InvalidMethod { route: String, method: String },

    #[error("backend `{backend}` has invalid base URL: {reason}")]
    InvalidBaseUrl { backend: String, reason: String },

    #[error("cannot build target URI `{0}`")]
    InvalidTarget(String),
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    /// Accepted methods; empty accepts any.
    pub methods: Vec<Method>,
    pub pattern: PathPattern,
    /// Backend base URL without trailing slash.
    pub backend_base: String,
    pub backend_path: PathPattern,
    pub require_authorization: bool,
    pub required_scopes: Vec<String>,
}

impl Route {
    /// Compile a route definition. `backends` maps backend names to base URLs.
    pub fn from_config(
        config: &RouteConfig,
        backends: &HashMap<String, String>,
    ) -> Result<Self, RouteError> {
        let pattern_error = |source| RouteError::Pattern {
            route: config.name.clone(),
            source,
        };

        let pattern = PathPattern::parse(&config.path).map_err(pattern_error)?;
        let backend_path = match &config.backend_path {
            Some(template) => PathPattern::parse(template).map_err(pattern_error)?,
            None => pattern.clone(),
        };
        if let Some(name) = backend_path.param_name() {
            if pattern.param_name() != Some(name) {
                return Err(pattern_error(PatternError::UnknownParameter(name.to_string())));
            }
        }

        let methods = config
            .methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    RouteError::InvalidMethod {
                        route: config.name.clone(),
                        method: method.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let backend_url = backends
            .get(&config.backend)
            .ok_or_else(|| RouteError::UnknownBackend {
                route: config.name.clone(),
                backend: config.backend.clone(),
            })?;

        Ok(Self {
            name: config.name.clone(),
            methods,
            pattern,
            backend_base: normalize_base_url(&config.backend, backend_url)?,
            backend_path,
            require_authorization: config.require_authorization,
            required_scopes: config.required_scopes.clone(),
        })
    }

    pub fn accepts(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Build the backend URI for a matched request.
    pub fn target_uri(&self, params: &PathParams, query: Option<&str>) -> Result<Uri, RouteError> {
        let path = self
            .backend_path
            .render(params)
            .map_err(|e| RouteError::InvalidTarget(e.to_string()))?;

        let target = match query {
            Some(query) => format!("{}{}?{}", self.backend_base, path, query),
            None => format!("{}{}", self.backend_base, path),
        };
        Uri::try_from(target.as_str()).map_err(|_| RouteError::InvalidTarget(target))
    }
}

/// Validate a forwarding base URL and strip its trailing slash.
///
/// Only `http` and `https` targets are accepted.
pub fn normalize_base_url(backend: &str, raw: &str) -> Result<String, RouteError> {
    let invalid = |reason: String| RouteError::InvalidBaseUrl {
        backend: backend.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("scheme `{}` is not supported", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".to_string()));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Name → base URL for every forwarding target, including the identity provider.
pub fn backend_targets(config: &GatewayConfig) -> HashMap<String, String> {
    let mut targets: HashMap<String, String> = config
        .backends
        .iter()
        .map(|b| (b.name.clone(), b.base_url.clone()))
        .collect();
    targets.insert(IDENTITY_BACKEND.to_string(), config.identity.domain.clone());
    targets
}

/// A route together with the parameters captured from the request path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

/// Read-only table of compiled routes, built once at startup.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, RouteError> {
        let backends = backend_targets(config);
        let routes = config
            .routes
            .iter()
            .map(|route| Route::from_config(route, &backends))
            .collect::<Result<Vec<_>, _>>()?;

        for route in &routes {
            tracing::debug!(
                route = %route.name,
                pattern = %route.pattern.as_str(),
                backend = %route.backend_base,
                auth = route.require_authorization,
                "Route compiled"
            );
        }
        Ok(Self::new(routes))
    }

    /// Find the first route accepting `method` whose pattern matches `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            if !route.accepts(method) {
                return None;
            }
            route
                .pattern
                .matches(path)
                .map(|params| RouteMatch { route, params })
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}
