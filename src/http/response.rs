//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream responses (status, body, content type) to the client
//! - Serve cached bodies with the content type they were stored with
//! - Mark cacheable responses with `x-cache: HIT|MISS`
//!
//! # Design Decisions
//! - Upstream statuses are relayed verbatim, 4xx and 5xx included
//! - Only the content type survives from upstream headers

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::cache::CachedResponse;
use crate::forward::UpstreamResponse;

pub const X_CACHE: &str = "x-cache";

/// Whether the response came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn header_value(self) -> HeaderValue {
        match self {
            CacheStatus::Hit => HeaderValue::from_static("HIT"),
            CacheStatus::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

/// Turn an upstream response into a client response.
pub fn relay(upstream: UpstreamResponse, cache: Option<CacheStatus>) -> Response {
    build(upstream.status, upstream.body, upstream.content_type.as_deref(), cache)
}

/// Serve a cache hit.
pub fn cached(entry: CachedResponse) -> Response {
    build(
        StatusCode::OK,
        entry.body,
        entry.content_type.as_deref(),
        Some(CacheStatus::Hit),
    )
}

fn build(status: StatusCode, body: Bytes, content_type: Option<&str>, cache: Option<CacheStatus>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(cache) = cache {
        headers.insert(X_CACHE, cache.header_value());
    }
    response
}
