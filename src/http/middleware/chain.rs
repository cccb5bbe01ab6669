//! Ordered middleware pipeline.
//!
//! Stages run strictly in order. Each returns a [`MiddlewareResult`]; the
//! first `ShortCircuit` ends the chain and its response goes straight to the
//! client, skipping later stages and the backend call.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{request::Parts, HeaderMap, Method, Response, Uri},
};
use futures_util::future::BoxFuture;

use crate::config::RateLimitConfig;
use crate::http::middleware::{
    auth::{AuthenticationStage, AuthorizationStage},
    logging::LoggingStage,
    rate_limit::RateLimitStage,
};
use crate::observability::metrics;
use crate::routing::{PathParams, Route};
use crate::security::{Claims, TokenValidator};

/// Outcome of one stage.
#[derive(Debug)]
pub enum MiddlewareResult {
    Continue,
    ShortCircuit(Response<Body>),
}

/// Identity established for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Claims),
    /// A token was presented and rejected.
    Rejected,
}

/// Per-request view handed to every stage.
///
/// The inbound request is read-only; stages communicate through `identity`
/// and `response_headers`.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub request_id: &'a str,
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub route: &'a Route,
    pub params: &'a PathParams,
    pub identity: Identity,
    /// Headers added to whatever response the request ends with.
    pub response_headers: HeaderMap,
}

impl<'a> RequestContext<'a> {
    pub fn new(request_id: &'a str, parts: &'a Parts, route: &'a Route, params: &'a PathParams) -> Self {
        Self {
            request_id,
            method: &parts.method,
            uri: &parts.uri,
            headers: &parts.headers,
            route,
            params,
            identity: Identity::Anonymous,
            response_headers: HeaderMap::new(),
        }
    }
}

/// A single interceptor in the chain.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, MiddlewareResult>;
}

/// Immutable, ordered list of stages built once at startup.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn Stage>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging, rate-limit annotation, authentication, authorization.
    pub fn standard(
        rate_limit: &RateLimitConfig,
        validator: Arc<dyn TokenValidator>,
    ) -> Result<Self, axum::http::Error> {
        Ok(Self::new()
            .with_stage(LoggingStage)
            .with_stage(RateLimitStage::new(rate_limit)?)
            .with_stage(AuthenticationStage::new(validator))
            .with_stage(AuthorizationStage))
    }

    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, ctx: &mut RequestContext<'_>) -> MiddlewareResult {
        for stage in &self.stages {
            if let MiddlewareResult::ShortCircuit(response) = stage.handle(ctx).await {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    stage = stage.name(),
                    status = response.status().as_u16(),
                    "Middleware short-circuited request"
                );
                metrics::record_short_circuit(stage.name(), response.status().as_u16());
                return MiddlewareResult::ShortCircuit(response);
            }
        }
        MiddlewareResult::Continue
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}
