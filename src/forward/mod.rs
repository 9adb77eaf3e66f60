//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! Replica selected
//!     → UpstreamRequest (method, replica, path, query, headers, body, user id)
//!     → Forwarder::forward (single attempt, bounded deadline)
//!     → UpstreamResponse (status, body, content type) or ForwardError
//! ```
//!
//! # Design Decisions
//! - Backends are reached through the `Forwarder` capability so the router
//!   can be exercised against a fake in tests
//! - No retries and no cache access here; the router owns both decisions
//! - Timeouts are distinct from other failures (504 vs 502)

pub mod client;

use axum::body::Bytes;
use axum::http::{uri::Authority, HeaderMap, Method, StatusCode};
use futures_util::future::BoxFuture;

pub use client::HttpForwarder;

/// A request bound for one replica.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub replica: Authority,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Authenticated caller, injected as a header when present.
    pub user_id: Option<String>,
}

impl UpstreamRequest {
    /// Path plus query, as sent on the request line.
    pub fn path_and_query(&self) -> String {
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

/// What came back from a replica.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Forwarding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("upstream {replica} unreachable: {reason}")]
    Unreachable { replica: String, reason: String },
    #[error("upstream {replica} timed out after {timeout_ms}ms")]
    Timeout { replica: String, timeout_ms: u128 },
}

impl ForwardError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Unreachable { .. } => "unreachable",
            ForwardError::Timeout { .. } => "timeout",
        }
    }
}

/// Capability to perform one downstream HTTP exchange.
pub trait Forwarder: Send + Sync {
    fn forward(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, ForwardError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let mut request = UpstreamRequest {
            method: Method::GET,
            replica: Authority::from_static("localhost:3001"),
            path: "/marketplace/list".into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            user_id: None,
        };
        assert_eq!(request.path_and_query(), "/marketplace/list");

        request.query = Some(String::new());
        assert_eq!(request.path_and_query(), "/marketplace/list");

        request.query = Some("page=2".into());
        assert_eq!(request.path_and_query(), "/marketplace/list?page=2");
    }
}
