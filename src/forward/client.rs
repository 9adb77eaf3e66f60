//! HTTP forwarder backed by the hyper client.
//!
//! # Responsibilities
//! - Build the upstream request (scheme, replica authority, path and query)
//! - Strip credentials and hop-by-hop headers, inject the user-id header
//! - Bound the whole exchange, body included, with one deadline
//!
//! # Design Decisions
//! - Pooled keep-alive connections per replica
//! - Connect failures (including connect timeouts) are `Unreachable`;
//!   only the overall deadline yields `Timeout`
//! - Response bodies are buffered so the router can cache them

use std::time::Duration;

use axum::body::Body;
use axum::http::{
    header::{self, HeaderName},
    uri::Scheme,
    HeaderMap, HeaderValue, Request, Uri,
};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::forward::{ForwardError, Forwarder, UpstreamRequest, UpstreamResponse};

/// Headers that never travel upstream.
static STRIPPED_HEADERS: [HeaderName; 10] = [
    header::AUTHORIZATION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards requests to replicas over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    user_id_header: HeaderName,
    max_response_bytes: usize,
}

impl HttpForwarder {
    /// Create a forwarder with an overall per-call deadline and a connect timeout.
    pub fn new(timeout: Duration, connect_timeout: Duration, user_id_header: HeaderName) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(connector);

        Self {
            client,
            timeout,
            user_id_header,
            max_response_bytes: 8 * 1024 * 1024,
        }
    }

    /// Cap on buffered upstream response bodies.
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ForwardError> {
        let replica = request.replica.to_string();
        let unreachable = |reason: String| ForwardError::Unreachable {
            replica: replica.clone(),
            reason,
        };

        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(request.replica.clone())
            .path_and_query(request.path_and_query())
            .build()
            .map_err(|e| unreachable(e.to_string()))?;

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = upstream_headers(
                &request.headers,
                &self.user_id_header,
                request.user_id.as_deref(),
            );
        }
        let upstream_request = builder
            .body(Body::from(request.body))
            .map_err(|e| unreachable(e.to_string()))?;

        let response: hyper::Response<Incoming> = self
            .client
            .request(upstream_request)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| unreachable(format!("failed to read response body: {}", e)))?;

        Ok(UpstreamResponse {
            status: parts.status,
            body,
            content_type,
        })
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, ForwardError>> {
        Box::pin(async move {
            let replica = request.replica.to_string();
            match tokio::time::timeout(self.timeout, self.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(ForwardError::Timeout {
                    replica,
                    timeout_ms: self.timeout.as_millis(),
                }),
            }
        })
    }
}

/// Copy end-to-end headers and attach the caller identity.
///
/// Any user-id header supplied by the client is dropped so only the
/// gateway can assert identity.
pub fn upstream_headers(
    incoming: &HeaderMap,
    user_id_header: &HeaderName,
    user_id: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len() + 1);
    for (name, value) in incoming {
        if STRIPPED_HEADERS.contains(name) || name == user_id_header || name.as_str() == "keep-alive" {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(user_id) = user_id {
        match HeaderValue::from_str(user_id) {
            Ok(value) => {
                headers.insert(user_id_header.clone(), value);
            }
            Err(_) => tracing::warn!(user_id = %user_id, "User id is not a valid header value"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_headers_strip_and_inject() {
        let user_header = HeaderName::from_static("x-user-id");
        let mut incoming = HeaderMap::new();
        incoming.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        incoming.insert(header::HOST, HeaderValue::from_static("gateway:8000"));
        incoming.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        incoming.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        incoming.insert("x-request-id", HeaderValue::from_static("req-1"));
        incoming.insert("x-user-id", HeaderValue::from_static("spoofed"));

        let headers = upstream_headers(&incoming, &user_header, Some("user-42"));

        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-request-id").unwrap(), "req-1");
        assert_eq!(headers.get_all("x-user-id").iter().count(), 1);
        assert_eq!(headers.get("x-user-id").unwrap(), "user-42");
    }

    #[test]
    fn test_no_user_header_when_anonymous() {
        let user_header = HeaderName::from_static("x-user-id");
        let mut incoming = HeaderMap::new();
        incoming.insert("x-user-id", HeaderValue::from_static("spoofed"));

        let headers = upstream_headers(&incoming, &user_header, None);
        assert!(headers.get("x-user-id").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_replica() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = HttpForwarder::new(
            Duration::from_secs(2),
            Duration::from_secs(1),
            HeaderName::from_static("x-user-id"),
        );
        let result = forwarder
            .forward(UpstreamRequest {
                method: axum::http::Method::GET,
                replica: addr.to_string().parse().unwrap(),
                path: "/marketplace/list".into(),
                query: None,
                headers: HeaderMap::new(),
                body: axum::body::Bytes::new(),
                user_id: None,
            })
            .await;

        assert!(matches!(result, Err(ForwardError::Unreachable { .. })));
    }
}
