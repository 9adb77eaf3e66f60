//! Replica abstraction.
//!
//! # Responsibilities
//! - Represent a single backend replica by its `host:port` authority
//! - Count how many requests were routed to it (observability only)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::uri::Authority;

use crate::load_balancer::SelectorError;

/// A single backend replica.
#[derive(Debug)]
pub struct Replica {
    /// The address as configured.
    pub address: String,
    /// Pre-parsed authority used to build upstream URIs.
    pub authority: Authority,
    /// Number of times this replica has been selected.
    selections: AtomicU64,
}

impl Replica {
    /// Create a replica from a `host:port` address.
    pub fn new(address: impl Into<String>) -> Result<Self, SelectorError> {
        let address = address.into();
        let authority: Authority = address
            .parse()
            .map_err(|_| SelectorError::InvalidAddress(address.clone()))?;
        if authority.port_u16().is_none() {
            return Err(SelectorError::InvalidAddress(address));
        }

        Ok(Self {
            address,
            authority,
            selections: AtomicU64::new(0),
        })
    }

    /// Record that the selector handed this replica out.
    pub fn record_selection(&self) {
        self.selections.fetch_add(1, Ordering::Relaxed);
    }

    /// Total selections so far.
    pub fn selections(&self) -> u64 {
        self.selections.load(Ordering::Relaxed)
    }
}

impl fmt::Display for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let replica = Replica::new("localhost:3001").unwrap();
        assert_eq!(replica.authority.host(), "localhost");
        assert_eq!(replica.authority.port_u16(), Some(3001));
        assert_eq!(replica.to_string(), "localhost:3001");
    }

    #[test]
    fn test_rejects_missing_port() {
        assert!(matches!(
            Replica::new("localhost"),
            Err(SelectorError::InvalidAddress(_))
        ));
        assert!(Replica::new("not a host").is_err());
    }
}
