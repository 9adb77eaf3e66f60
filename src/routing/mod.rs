//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: gateway endpoint, upstream group, or no match
//!
//! Route Compilation (at startup):
//!     UpstreamConfig[]
//!     → gateway endpoints first (exact method + path)
//!     → upstream groups sorted by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{LocalEndpoint, Route, Router, UpstreamRoute};
