//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_short_circuits_total` (counter): middleware rejections by stage, status
//! - `gateway_upstream_errors_total` (counter): failed backend calls by route, kind
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Backend response relayed.
    Forwarded,
    /// A middleware stage answered.
    ShortCircuited,
    /// No route, backend failure or internal error.
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::ShortCircuited => "short_circuited",
            Outcome::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, outcome: Outcome, start: Instant) {
    let route = route.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_short_circuit(stage: &'static str, status: u16) {
    counter!(
        "gateway_short_circuits_total",
        "stage" => stage,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_upstream_error(route: &str, kind: &'static str) {
    counter!(
        "gateway_upstream_errors_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}
