//! Edge API Gateway Library
//!
//! Routes inbound requests to internal backends, runs the middleware chain
//! (logging, rate-limit annotation, authentication, authorization) and
//! relays backend responses back to the client.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::{GatewayError, StartupError};
pub use http::GatewayServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
