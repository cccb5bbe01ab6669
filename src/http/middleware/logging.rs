//! Request logging stage.

use futures_util::future::BoxFuture;

use crate::http::middleware::chain::{MiddlewareResult, RequestContext, Stage};

/// Records every matched request. Never short-circuits.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStage;

impl Stage for LoggingStage {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, MiddlewareResult> {
        tracing::info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.uri.path(),
            route = %ctx.route.name,
            "Incoming request"
        );
        Box::pin(std::future::ready(MiddlewareResult::Continue))
    }
}
