//! Security subsystem: identity validation.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → http::middleware::auth (authentication stage)
//!     → TokenValidator::validate
//!         → introspection.rs (identity provider, RFC 7662)
//!         → validator.rs (static table, local runs and tests)
//!     → Claims or AuthError
//! ```
//!
//! # Design Decisions
//! - Validation is a capability injected at startup, not looked up per request
//! - Validator errors are logged, never returned to clients
//! - Validators hold no per-request state and are shared across tasks

pub mod introspection;
pub mod validator;

pub use introspection::IntrospectionValidator;
pub use validator::{AuthError, Claims, StaticTokenValidator, TokenValidator};
