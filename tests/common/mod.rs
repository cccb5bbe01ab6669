//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::{stream, StreamExt};
use tokio::net::TcpListener;

use edge_gateway::config::GatewayConfig;
use edge_gateway::http::HyperUpstream;
use edge_gateway::security::{Claims, StaticTokenValidator};
use edge_gateway::{GatewayServer, Shutdown};

pub const VALID_TOKEN: &str = "valid-token";

/// Per-backend call counters.
#[derive(Default)]
pub struct Calls {
    pub warehouse: AtomicUsize,
    pub sales: AtomicUsize,
    pub identity: AtomicUsize,
    /// Set once the body of `/warehouse/stream` is dropped.
    pub stream_dropped: AtomicBool,
}

impl Calls {
    pub fn sales(&self) -> usize {
        self.sales.load(Ordering::SeqCst)
    }

    pub fn warehouse(&self) -> usize {
        self.warehouse.load(Ordering::SeqCst)
    }

    pub fn identity(&self) -> usize {
        self.identity.load(Ordering::SeqCst)
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub struct Backends {
    pub warehouse: SocketAddr,
    pub sales: SocketAddr,
    pub identity: SocketAddr,
    pub calls: Arc<Calls>,
}

/// Start the warehouse, sales and identity mock backends.
pub async fn start_backends() -> Backends {
    let calls = Arc::new(Calls::default());

    let c = calls.clone();
    let warehouse = Router::new()
        .route(
            "/warehouse",
            get(move || {
                let c = c.clone();
                async move {
                    c.warehouse.fetch_add(1, Ordering::SeqCst);
                    "Welcome to the warehouse!"
                }
            }),
        )
        .route("/warehouse/stream", {
            let c = calls.clone();
            get(move || endless_stream(c.clone()))
        });

    let c = calls.clone();
    let sales = Router::new().route(
        "/sku/{sku}",
        get(move |Path(sku): Path<String>, headers: HeaderMap| {
            let c = c.clone();
            async move {
                c.sales.fetch_add(1, Ordering::SeqCst);
                let seen_auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                (
                    [
                        ("x-backend", "sales".to_string()),
                        ("x-seen-authorization", seen_auth),
                        ("set-cookie", "session=1".to_string()),
                    ],
                    format!("You're looking at SKU {sku}!"),
                )
            }
        }),
    );

    let c = calls.clone();
    let identity = Router::new().route(
        "/oauth/token",
        post(move |headers: HeaderMap, body: Bytes| {
            let c = c.clone();
            async move {
                c.identity.fetch_add(1, Ordering::SeqCst);
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let echoed = format!("{content_type}|{}", String::from_utf8_lossy(&body));
                (StatusCode::OK, echoed)
            }
        }),
    );

    Backends {
        warehouse: serve(warehouse).await,
        sales: serve(sales).await,
        identity: serve(identity).await,
        calls,
    }
}

/// Marks [`Calls::stream_dropped`] when the body holding it goes away.
struct DropGuard(Arc<Calls>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.stream_dropped.store(true, Ordering::SeqCst);
    }
}

/// Sends one chunk, then keeps the body open.
async fn endless_stream(calls: Arc<Calls>) -> impl IntoResponse {
    calls.stream_dropped.store(false, Ordering::SeqCst);
    let guard = DropGuard(calls);
    let first = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; 1024]))]);
    let body = first.chain(stream::pending()).map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Response::new(Body::from_stream(body))
}

/// Gateway configuration pointing at `backends`.
pub fn gateway_config(backends: &Backends) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.timeouts.upstream_secs = 2;
    config.identity.domain = format!("http://{}", backends.identity);
    for backend in &mut config.backends {
        backend.base_url = match backend.name.as_str() {
            "warehouse" => format!("http://{}", backends.warehouse),
            _ => format!("http://{}", backends.sales),
        };
    }
    config.routes.push(edge_gateway::config::RouteConfig {
        name: "warehouse-stream".to_string(),
        path: "/warehouse/stream".to_string(),
        methods: vec!["GET".to_string()],
        backend: "warehouse".to_string(),
        backend_path: None,
        require_authorization: false,
        required_scopes: Vec::new(),
    });
    config
}

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Boot the gateway on an ephemeral port with a static token table.
pub async fn start_gateway(config: GatewayConfig) -> RunningGateway {
    let validator = StaticTokenValidator::new().with_token(
        VALID_TOKEN,
        Claims::for_subject("tester").with_scopes(["read:sales"]),
    );
    let upstream = HyperUpstream::new(Duration::from_secs(1));
    let server = GatewayServer::with_parts(config, Arc::new(validator), Arc::new(upstream)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    RunningGateway { addr, shutdown }
}
