//! Per-request orchestration.
//!
//! # Responsibilities
//! - Match the route, run the middleware chain
//! - Translate and forward the request through the injected [`Upstream`]
//! - Relay the backend response, or turn failures into responses
//! - Record one metrics sample per request
//!
//! # Design Decisions
//! - One outbound attempt per request, bounded by the upstream timeout
//! - Stage annotations are added to every response; a header the backend
//!   already set is left alone
//! - Client disconnect drops the dispatch future, which cancels the
//!   outbound call

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{request::Parts, Request, Response},
    response::IntoResponse,
};

use crate::error::GatewayError;
use crate::http::headers::insert_missing;
use crate::http::middleware::{MiddlewareChain, MiddlewareResult, RequestContext};
use crate::http::request::{request_id, translate};
use crate::http::response::relay;
use crate::http::upstream::Upstream;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{self, Outcome};
use crate::routing::{PathParams, Route, RouteTable};

/// Shared, immutable request pipeline.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    chain: MiddlewareChain,
    upstream: Arc<dyn Upstream>,
    upstream_timeout: Duration,
    /// Relays stop copying once this fires.
    relay_shutdown: Arc<Shutdown>,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        chain: MiddlewareChain,
        upstream: Arc<dyn Upstream>,
        upstream_timeout: Duration,
        relay_shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            routes,
            chain,
            upstream,
            upstream_timeout,
            relay_shutdown,
        }
    }

    /// Handle one client request. Never fails: every outcome is a response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let request_id = request_id(&parts.headers);

        let Some(matched) = self.routes.match_route(&parts.method, parts.uri.path()) else {
            tracing::warn!(
                request_id = %request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                "No route matched"
            );
            let response = GatewayError::RouteNotFound {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
            }
            .into_response();
            metrics::record_request(parts.method.as_str(), 404, "none", Outcome::Failed, start);
            return response;
        };
        let route = matched.route;

        let mut ctx = RequestContext::new(&request_id, &parts, route, &matched.params);
        let verdict = self.chain.run(&mut ctx).await;
        let annotations = std::mem::take(&mut ctx.response_headers);

        let (mut response, outcome) = match verdict {
            MiddlewareResult::ShortCircuit(response) => (response, Outcome::ShortCircuited),
            MiddlewareResult::Continue => {
                match self.forward(&request_id, &parts, body, route, &matched.params).await {
                    Ok(response) => (response, Outcome::Forwarded),
                    Err(err) => {
                        log_failure(&request_id, route, &err);
                        (err.into_response(), Outcome::Failed)
                    }
                }
            }
        };

        insert_missing(response.headers_mut(), &annotations);

        let status = response.status().as_u16();
        tracing::debug!(
            request_id = %request_id,
            route = %route.name,
            status,
            outcome = outcome.as_str(),
            "Request completed"
        );
        metrics::record_request(parts.method.as_str(), status, &route.name, outcome, start);
        response
    }

    async fn forward(
        &self,
        request_id: &str,
        parts: &Parts,
        body: Body,
        route: &Route,
        params: &PathParams,
    ) -> Result<Response<Body>, GatewayError> {
        let target = route.target_uri(params, parts.uri.query())?;
        let outbound = translate(parts, body, target)?;

        tracing::debug!(
            request_id = %request_id,
            route = %route.name,
            target = %outbound.uri(),
            "Forwarding request"
        );

        let backend = match tokio::time::timeout(self.upstream_timeout, self.upstream.call(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                metrics::record_upstream_error(&route.name, e.kind());
                return Err(GatewayError::BackendUnreachable(e));
            }
            Err(_) => {
                metrics::record_upstream_error(&route.name, "timeout");
                return Err(GatewayError::BackendTimeout(self.upstream_timeout));
            }
        };

        Ok(relay(Some(backend), self.relay_shutdown.subscribe())?)
    }
}

fn log_failure(request_id: &str, route: &Route, err: &GatewayError) {
    match err {
        GatewayError::BackendUnreachable(_) | GatewayError::BackendTimeout(_) => tracing::warn!(
            request_id = %request_id,
            route = %route.name,
            error = %err,
            "Upstream request failed"
        ),
        _ => tracing::error!(
            request_id = %request_id,
            route = %route.name,
            error = %err,
            "Internal gateway error"
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{GatewayConfig, RateLimitConfig};
    use crate::http::upstream::{HyperUpstream, UpstreamError};
    use crate::security::{Claims, StaticTokenValidator};
    use axum::body::to_bytes;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records what it receives and answers with a fixed response.
    #[derive(Default)]
    pub(crate) struct MockUpstream {
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<(Method, Uri, HeaderMap)>>,
        pub hang: bool,
    }

    impl Upstream for MockUpstream {
        fn call(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, UpstreamError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let (parts, body) = request.into_parts();
                self.seen
                    .lock()
                    .unwrap()
                    .push((parts.method, parts.uri.clone(), parts.headers));
                if self.hang {
                    std::future::pending::<()>().await;
                }

                let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
                let text = if bytes.is_empty() {
                    format!("backend saw {}", parts.uri.path())
                } else {
                    String::from_utf8_lossy(&bytes).into_owned()
                };
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("x-backend", "mock")
                    .body(Body::from(text))
                    .unwrap())
            })
        }
    }

    pub(crate) fn validator() -> Arc<StaticTokenValidator> {
        Arc::new(StaticTokenValidator::new().with_token("good", Claims::for_subject("alice")))
    }

    fn dispatcher(upstream: Arc<dyn Upstream>, timeout: Duration) -> Dispatcher {
        let config = GatewayConfig::default();
        Dispatcher::new(
            Arc::new(RouteTable::from_config(&config).unwrap()),
            MiddlewareChain::standard(&RateLimitConfig::default(), validator()).unwrap(),
            upstream,
            timeout,
            Arc::new(Shutdown::new()),
        )
    }

    fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: &'static str) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn open_route_is_forwarded() {
        let upstream = Arc::new(MockUpstream::default());
        let dispatcher = dispatcher(upstream.clone(), Duration::from_secs(5));

        let response = dispatcher.dispatch(request("GET", "/warehouse", &[], "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-backend"], "mock");
        assert_eq!(response.headers()["x-ratelimit-limit"], "unlimited");
        assert_eq!(body_text(response).await, "backend saw /warehouse");

        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].1, Uri::from_static("http://localhost:5001/warehouse"));
        assert_eq!(seen[0].2["host"], "localhost:5001");
    }

    #[tokio::test]
    async fn protected_route_without_token_never_reaches_backend() {
        let upstream = Arc::new(MockUpstream::default());
        let dispatcher = dispatcher(upstream.clone(), Duration::from_secs(5));

        let response = dispatcher.dispatch(request("GET", "/sales/sku/42", &[], "")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-ratelimit-limit"], "unlimited");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn protected_route_with_token_maps_path_and_query() {
        let upstream = Arc::new(MockUpstream::default());
        let dispatcher = dispatcher(upstream.clone(), Duration::from_secs(5));

        let response = dispatcher
            .dispatch(request(
                "GET",
                "/sales/sku/42?verbose=1",
                &[("authorization", "Bearer good")],
                "",
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "backend saw /sku/42");

        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].1, Uri::from_static("http://localhost:5002/sku/42?verbose=1"));
        assert_eq!(seen[0].2["authorization"], "Bearer good");
    }

    #[tokio::test]
    async fn unmatched_path_and_method_are_404() {
        let upstream = Arc::new(MockUpstream::default());
        let dispatcher = dispatcher(upstream.clone(), Duration::from_secs(5));

        let response = dispatcher.dispatch(request("GET", "/nowhere", &[], "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = dispatcher.dispatch(request("DELETE", "/warehouse", &[], "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_post_forwards_body() {
        let upstream = Arc::new(MockUpstream::default());
        let dispatcher = dispatcher(upstream.clone(), Duration::from_secs(5));

        let response = dispatcher
            .dispatch(request(
                "POST",
                "/token",
                &[("content-type", "application/x-www-form-urlencoded")],
                "grant_type=client_credentials",
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "grant_type=client_credentials");

        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::POST);
        assert_eq!(seen[0].1, Uri::from_static("http://localhost:5003/oauth/token"));
        assert_eq!(seen[0].2["content-type"], "application/x-www-form-urlencoded");
    }

    #[tokio::test]
    async fn response_body_outlives_dispatcher() {
        let dispatcher = dispatcher(Arc::new(MockUpstream::default()), Duration::from_secs(5));

        let response = dispatcher.dispatch(request("GET", "/warehouse", &[], "")).await;
        drop(dispatcher);
        assert_eq!(body_text(response).await, "backend saw /warehouse");
    }

    #[tokio::test]
    async fn slow_backend_is_504() {
        let upstream = Arc::new(MockUpstream {
            hang: true,
            ..MockUpstream::default()
        });
        let dispatcher = dispatcher(upstream.clone(), Duration::from_millis(50));

        let response = dispatcher.dispatch(request("GET", "/warehouse", &[], "")).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()["x-ratelimit-limit"], "unlimited");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_is_502() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = GatewayConfig::default();
        config.backends[0].base_url = format!("http://{addr}");
        let dispatcher = Dispatcher::new(
            Arc::new(RouteTable::from_config(&config).unwrap()),
            MiddlewareChain::new(),
            Arc::new(HyperUpstream::new(Duration::from_secs(1))),
            Duration::from_secs(5),
            Arc::new(Shutdown::new()),
        );

        let response = dispatcher.dispatch(request("GET", "/warehouse", &[], "")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
