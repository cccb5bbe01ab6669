//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-wise pattern match)
//!     → Return: RouteMatch (route + captured parameter) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + backend base URLs
//!     → Parse path patterns and backend templates
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (configuration order)

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern, PatternError};
pub use router::{Route, RouteError, RouteMatch, RouteTable};
