//! Gateway error types.
//!
//! Every expected failure maps to an ordinary HTTP response. Only
//! [`RelayError::NullResponse`](crate::http::response::RelayError) is treated
//! as an internal bug.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::http::response::RelayError;
use crate::http::upstream::UpstreamError;
use crate::routing::RouteError;

/// Failure outcome of a proxied request.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("bearer token missing")]
    AuthenticationMissing,

    #[error("bearer token rejected")]
    AuthenticationInvalid,

    #[error("route `{route}` requires scopes the token does not grant")]
    AuthorizationDenied { route: String },

    #[error("backend unreachable: {0}")]
    BackendUnreachable(#[source] UpstreamError),

    #[error("backend did not respond within {0:?}")]
    BackendTimeout(Duration),

    #[error("invalid backend target: {0}")]
    InvalidTarget(#[from] RouteError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::AuthenticationMissing | GatewayError::AuthenticationInvalid => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            GatewayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::InvalidTarget(_) | GatewayError::Relay(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Never carries provider or backend detail.
    fn public_message(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "No matching route found",
            GatewayError::AuthenticationMissing | GatewayError::AuthenticationInvalid => {
                "Unauthorized"
            }
            GatewayError::AuthorizationDenied { .. } => "Forbidden",
            GatewayError::BackendUnreachable(_) => "Upstream request failed",
            GatewayError::BackendTimeout(_) => "Upstream request timed out",
            GatewayError::InvalidTarget(_) | GatewayError::Relay(_) => "Internal gateway error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.public_message()));
        *response.status_mut() = self.status();

        let challenge = match self {
            GatewayError::AuthenticationMissing => Some("Bearer"),
            GatewayError::AuthenticationInvalid => Some("Bearer error=\"invalid_token\""),
            _ => None,
        };
        if let Some(challenge) = challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("route table: {0}")]
    Routes(#[from] RouteError),

    #[error("identity client: {0}")]
    IdentityClient(#[from] reqwest::Error),

    #[error("middleware header: {0}")]
    Header(#[from] axum::http::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        let not_found = GatewayError::RouteNotFound {
            method: "GET".into(),
            path: "/x".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::AuthenticationMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatewayError::AuthorizationDenied { route: "r".into() }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::BackendTimeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Relay(RelayError::NullResponse).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let response = GatewayError::AuthenticationInvalid.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Bearer error=\"invalid_token\""
        );

        let forbidden = GatewayError::AuthorizationDenied { route: "r".into() }.into_response();
        assert!(forbidden.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
