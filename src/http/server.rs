//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway handler as fallback
//! - Wire up tower layers (request id, tracing, request timeout)
//! - Build the dispatcher from configuration and injected capabilities
//! - Serve with graceful shutdown, cancelling in-flight relays

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::StartupError;
use crate::http::dispatcher::Dispatcher;
use crate::http::middleware::MiddlewareChain;
use crate::http::upstream::{HyperUpstream, Upstream};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::routing::RouteTable;
use crate::security::{IntrospectionValidator, TokenValidator};

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    relay_shutdown: Arc<Shutdown>,
}

impl GatewayServer {
    /// Production wiring: token introspection and the pooled HTTP client.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let validator = Arc::new(IntrospectionValidator::new(&config.identity)?);
        let upstream = Arc::new(HyperUpstream::new(Duration::from_secs(
            config.timeouts.connect_secs,
        )));
        Self::with_parts(config, validator, upstream)
    }

    pub fn with_parts(
        config: GatewayConfig,
        validator: Arc<dyn TokenValidator>,
        upstream: Arc<dyn Upstream>,
    ) -> Result<Self, StartupError> {
        let routes = Arc::new(RouteTable::from_config(&config)?);
        let chain = MiddlewareChain::standard(&config.rate_limit, validator)?;
        tracing::debug!(stages = ?chain.stage_names(), routes = routes.len(), "Pipeline built");

        let relay_shutdown = Arc::new(Shutdown::new());
        let dispatcher = Arc::new(Dispatcher::new(
            routes,
            chain,
            upstream,
            Duration::from_secs(config.timeouts.upstream_secs),
            relay_shutdown.clone(),
        ));

        let router = Self::build_router(&config, dispatcher);
        Ok(Self {
            router,
            config,
            relay_shutdown,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(dispatcher)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain connections.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let relay_shutdown = self.relay_shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.triggered().await;
                tracing::info!("Draining connections");
                relay_shutdown.trigger();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.dispatch(request).await
}
