//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Cacheable GET → signature.rs (method + path + sorted query)
//!     → store.rs get: fresh hit returned immediately
//!     → miss: request forwarded, a 200 response is stored with the TTL
//! ```
//!
//! # Design Decisions
//! - Expiry is checked lazily on read; no background sweep
//! - One TTL for every cacheable route
//! - Writes through the gateway do not invalidate entries; staleness is
//!   bounded by the TTL

pub mod signature;
pub mod store;

pub use signature::signature;
pub use store::{CacheStats, CachedResponse, ResponseCache};
