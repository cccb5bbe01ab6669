//! Stand-in backends for running the gateway locally.
//!
//! Serves the warehouse and sales services on the default backend ports, and
//! a minimal identity provider that issues and introspects one fixed token.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::Path,
    routing::{get, post},
    Form, Json, Router,
};
use clap::Parser;
use serde_json::{json, Value};

const DEV_TOKEN: &str = "dev-token";

#[derive(Parser, Debug)]
#[command(name = "stub-backends", about = "Local stand-ins for the gateway backends")]
struct Cli {
    #[arg(long, default_value_t = 5001)]
    warehouse_port: u16,

    #[arg(long, default_value_t = 5002)]
    sales_port: u16,

    #[arg(long, default_value_t = 5003)]
    identity_port: u16,
}

async fn sku(Path(sku): Path<String>) -> String {
    format!("You're looking at SKU {sku}!")
}

async fn issue_token() -> Json<Value> {
    Json(json!({
        "access_token": DEV_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

async fn introspect(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    let active = form.get("token").map(String::as_str) == Some(DEV_TOKEN);
    if active {
        Json(json!({ "active": true, "sub": "local-dev", "scope": "read:sales" }))
    } else {
        Json(json!({ "active": false }))
    }
}

async fn serve(name: &'static str, port: u16, app: Router) -> std::io::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(backend = name, address = %addr, "Stub backend listening");
    axum::serve(listener, app).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stub_backends=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let warehouse = Router::new().route("/warehouse", get(|| async { "Welcome to the warehouse!" }));
    let sales = Router::new().route("/sku/{sku}", get(sku));
    let identity = Router::new()
        .route("/oauth/token", post(issue_token))
        .route("/oauth/introspect", post(introspect));

    tokio::try_join!(
        serve("warehouse", cli.warehouse_port, warehouse),
        serve("sales", cli.sales_port, sales),
        serve("identity", cli.identity_port, identity),
    )?;
    Ok(())
}
