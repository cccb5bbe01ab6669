//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → dispatcher.rs (route match, middleware chain)
//!     → request.rs (translate to the backend request)
//!     → upstream.rs (single outbound call)
//!     → response.rs (relay status, headers, streamed body)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod headers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use dispatcher::Dispatcher;
pub use request::X_REQUEST_ID;
pub use response::{RelayError, RELAY_CHUNK_SIZE};
pub use server::GatewayServer;
pub use upstream::{HyperUpstream, Upstream, UpstreamError};
