//! Rate-limit annotation stage.
//!
//! Announces the configured policy on every response. Nothing is counted and
//! nothing is rejected.

use axum::http::{HeaderName, HeaderValue};
use futures_util::future::BoxFuture;

use crate::config::RateLimitConfig;
use crate::http::middleware::chain::{MiddlewareResult, RequestContext, Stage};

#[derive(Debug, Clone)]
pub struct RateLimitStage {
    name: HeaderName,
    value: HeaderValue,
}

impl RateLimitStage {
    pub fn new(config: &RateLimitConfig) -> Result<Self, axum::http::Error> {
        Ok(Self {
            name: HeaderName::try_from(config.header_name.as_str())?,
            value: HeaderValue::try_from(config.policy.as_str())?,
        })
    }

    pub fn header(&self) -> (&HeaderName, &HeaderValue) {
        (&self.name, &self.value)
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, MiddlewareResult> {
        ctx.response_headers
            .insert(self.name.clone(), self.value.clone());
        Box::pin(std::future::ready(MiddlewareResult::Continue))
    }
}
