//! Authentication and authorization stages.
//!
//! Authentication turns an `Authorization: Bearer <token>` header into an
//! [`Identity`]. Only routes that require authorization reject requests;
//! elsewhere a missing or bad token leaves the request anonymous.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Response},
    response::IntoResponse,
};
use futures_util::future::BoxFuture;

use crate::error::GatewayError;
use crate::http::middleware::chain::{Identity, MiddlewareResult, RequestContext, Stage};
use crate::security::TokenValidator;

/// Bearer token from the `Authorization` header. The scheme is matched
/// case-insensitively; other schemes and empty tokens count as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn reject(error: GatewayError) -> MiddlewareResult {
    let response: Response<Body> = error.into_response();
    MiddlewareResult::ShortCircuit(response)
}

pub struct AuthenticationStage {
    validator: Arc<dyn TokenValidator>,
}

impl AuthenticationStage {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    async fn authenticate(&self, ctx: &mut RequestContext<'_>) -> MiddlewareResult {
        let required = ctx.route.require_authorization;

        let Some(token) = bearer_token(ctx.headers) else {
            if required {
                tracing::debug!(request_id = %ctx.request_id, route = %ctx.route.name, "Bearer token missing");
                return reject(GatewayError::AuthenticationMissing);
            }
            return MiddlewareResult::Continue;
        };

        match self.validator.validate(token).await {
            Ok(claims) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    subject = claims.subject.as_deref().unwrap_or("-"),
                    "Token accepted"
                );
                ctx.identity = Identity::Authenticated(claims);
                MiddlewareResult::Continue
            }
            Err(e) => {
                if e.is_provider_failure() {
                    tracing::warn!(request_id = %ctx.request_id, error = %e, "Token validation failed");
                } else {
                    tracing::debug!(request_id = %ctx.request_id, error = %e, "Token rejected");
                }
                ctx.identity = Identity::Rejected;
                if required {
                    reject(GatewayError::AuthenticationInvalid)
                } else {
                    MiddlewareResult::Continue
                }
            }
        }
    }
}

impl Stage for AuthenticationStage {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(self.authenticate(ctx))
    }
}

/// Enforces the route's authorization flag and required scopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationStage;

impl AuthorizationStage {
    fn authorize(ctx: &RequestContext<'_>) -> MiddlewareResult {
        if !ctx.route.require_authorization {
            return MiddlewareResult::Continue;
        }

        match &ctx.identity {
            Identity::Anonymous => reject(GatewayError::AuthenticationMissing),
            Identity::Rejected => reject(GatewayError::AuthenticationInvalid),
            Identity::Authenticated(claims) if claims.has_scopes(&ctx.route.required_scopes) => {
                MiddlewareResult::Continue
            }
            Identity::Authenticated(claims) => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    route = %ctx.route.name,
                    subject = claims.subject.as_deref().unwrap_or("-"),
                    "Token lacks required scopes"
                );
                reject(GatewayError::AuthorizationDenied {
                    route: ctx.route.name.clone(),
                })
            }
        }
    }
}

impl Stage for AuthorizationStage {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(std::future::ready(Self::authorize(ctx)))
    }
}
