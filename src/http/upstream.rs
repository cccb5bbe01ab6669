//! Outbound call capability.
//!
//! The dispatcher only sees [`Upstream`]; production wiring uses a single
//! pooled `hyper_util` client shared by every request. Targets may be plain
//! `http` or `https` (rustls with the webpki root set).

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
};
use futures_util::future::BoxFuture;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("connection failed: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),

    #[error("request failed: {0}")]
    Transport(#[source] hyper_util::client::legacy::Error),
}

impl UpstreamError {
    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Transport(_) => "transport",
        }
    }
}

impl From<hyper_util::client::legacy::Error> for UpstreamError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            UpstreamError::Connect(err)
        } else {
            UpstreamError::Transport(err)
        }
    }
}

/// Performs one outbound HTTP call. Implementations must be safe to share
/// across concurrent requests.
pub trait Upstream: Send + Sync {
    fn call(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, UpstreamError>>;
}

/// Pooled HTTP/1.1 + HTTP/2 client.
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HyperUpstream {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(connect_timeout));
        http.set_nodelay(true);
        http.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl Upstream for HyperUpstream {
    fn call(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, UpstreamError>> {
        Box::pin(async move {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
