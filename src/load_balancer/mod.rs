//! Load balancing subsystem (replica selection).
//!
//! # Data Flow
//! ```text
//! Route matched → upstream group identified
//!     → pool.rs (look up the group in the registry)
//!     → round_robin.rs (atomic read-and-advance of the cursor)
//!     → replica.rs (selected host:port)
//!     → Return replica to the forwarding engine
//! ```
//!
//! # Design Decisions
//! - Replica lists are fixed at startup; empty groups are rejected then
//! - The cursor lives in the group, never in a static
//! - No health checking: unreachable replicas are the forwarder's problem

pub mod pool;
pub mod replica;
pub mod round_robin;

use std::sync::Arc;

pub use pool::{GroupStats, UpstreamGroup, UpstreamRegistry};
pub use replica::Replica;
pub use round_robin::RoundRobin;

/// Strategy for picking a replica out of a pool.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next replica, or `None` if the pool is empty.
    fn next_replica(&self, replicas: &[Arc<Replica>]) -> Option<Arc<Replica>>;
}

/// Errors raised while building or querying upstream groups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("upstream group '{0}' has no replicas")]
    NoReplicas(String),
    #[error("invalid replica address '{0}'")]
    InvalidAddress(String),
    #[error("unknown upstream group '{0}'")]
    UnknownGroup(String),
}
