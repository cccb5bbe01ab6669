//! Request interceptors run before forwarding.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → logging.rs        (always continues)
//!     → rate_limit.rs     (annotates the response, always continues)
//!     → auth.rs           (authentication, then authorization)
//!     → Continue or ShortCircuit(response)
//! ```

pub mod auth;
pub mod chain;
pub mod logging;
pub mod rate_limit;

pub use auth::{AuthenticationStage, AuthorizationStage};
pub use chain::{Identity, MiddlewareChain, MiddlewareResult, RequestContext, Stage};
pub use logging::LoggingStage;
pub use rate_limit::RateLimitStage;
