//! HTTP server setup and request orchestration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Bind server to listener and drain on shutdown
//! - Dispatch requests to local endpoints or upstream groups
//! - Authenticate, consult the cache, pick a replica and forward

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{self, CredentialError, CredentialPolicy, CredentialStore, TokenService};
use crate::cache::{self, ResponseCache};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::forward::{Forwarder, HttpForwarder, UpstreamRequest};
use crate::http::handlers;
use crate::http::request::{self, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{self, CacheStatus};
use crate::load_balancer::{SelectorError, UpstreamRegistry};
use crate::observability::metrics;
use crate::routing::{Route, Router as RouteTable, UpstreamRoute};

/// Errors raised while assembling the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid upstream configuration: {0}")]
    Upstreams(#[from] SelectorError),
    #[error("failed to initialise credential store: {0}")]
    Credentials(#[from] CredentialError),
    #[error("invalid user id header: {0}")]
    UserIdHeader(String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub routes: Arc<RouteTable>,
    pub upstreams: Arc<UpstreamRegistry>,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
    /// `None` when caching is disabled.
    pub cache: Option<Arc<ResponseCache>>,
    pub forwarder: Arc<dyn Forwarder>,
    /// `None` when no Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    state: GatewayState,
}

impl GatewayServer {
    /// Create a server that forwards over HTTP.
    pub fn new(config: GatewayConfig, metrics: Option<PrometheusHandle>) -> Result<Self, StartupError> {
        let user_id_header = parse_user_id_header(&config.auth.user_id_header)?;
        let forwarder = HttpForwarder::new(
            Duration::from_secs(config.timeouts.upstream_secs),
            Duration::from_secs(config.timeouts.connect_secs),
            user_id_header,
        )
        .with_max_response_bytes(config.limits.max_response_bytes);

        Self::with_forwarder(config, Arc::new(forwarder), metrics)
    }

    /// Create a server with an injected forwarder.
    pub fn with_forwarder(
        config: GatewayConfig,
        forwarder: Arc<dyn Forwarder>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, StartupError> {
        let routes = Arc::new(RouteTable::from_config(&config.upstreams));
        let upstreams = Arc::new(UpstreamRegistry::from_config(&config.upstreams)?);
        let credentials = Arc::new(CredentialStore::new(CredentialPolicy {
            min_username_len: config.auth.min_username_len,
            min_password_len: config.auth.min_password_len,
        })?);
        let tokens = Arc::new(TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::new(Duration::from_secs(config.cache.ttl_secs))));

        let state = GatewayState {
            routes,
            upstreams,
            credentials,
            tokens,
            cache,
            forwarder,
            metrics,
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, config, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: GatewayState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request::request_id(req.headers()),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The assembled router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until the shutdown signal fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            groups = self.config.upstreams.len(),
            cache_enabled = self.state.cache.is_some(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn parse_user_id_header(name: &str) -> Result<HeaderName, StartupError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| StartupError::UserIdHeader(e.to_string()))
}

/// Main gateway handler.
/// Looks up the route and either serves it locally or proxies it.
async fn gateway_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request::request_id(request.headers()).to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Handling request"
    );

    let (route_name, result) = match state.routes.match_request(&method, &path) {
        Some(Route::Local(endpoint)) => (endpoint.name(), handlers::handle(endpoint, &state, request).await),
        Some(Route::Upstream(route)) => (
            route.group.as_str(),
            proxy(&state, route, request, &request_id).await,
        ),
        None => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
            ("none", Err(GatewayError::RouteNotFound(path.clone())))
        }
    };

    let response = result.unwrap_or_else(IntoResponse::into_response);
    metrics::record_request(method.as_str(), route_name, response.status().as_u16(), start_time);
    response
}

/// Authenticated proxy path for one upstream group.
async fn proxy(
    state: &GatewayState,
    route: &UpstreamRoute,
    request: Request<Body>,
    request_id: &str,
) -> Result<Response, GatewayError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(String::from);

    // 1. Authenticate
    let claims = if route.requires_auth() {
        match auth::bearer_token(request.headers()).and_then(|token| state.tokens.verify(token)) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::info!(request_id = %request_id, group = %route.group, error = %e, "Token rejected");
                return Err(e.into());
            }
        }
    } else {
        None
    };

    // 2. Cache lookup (cacheable GETs only)
    let cache = state.cache.as_deref().filter(|_| route.is_cacheable(&method));
    let signature = cache.map(|_| cache::signature(&method, &path, query.as_deref()));
    if let (Some(cache), Some(signature)) = (cache, signature.as_deref()) {
        if let Some(hit) = cache.get(signature) {
            tracing::debug!(request_id = %request_id, signature = %signature, "Cache hit");
            return Ok(response::cached(hit));
        }
    }

    // 3. Select replica
    let replica = state.upstreams.next_replica(&route.group)?;

    // 4. Forward
    let (parts, body) = request.into_parts();
    let body = request::buffer_body(body, state.max_body_bytes).await?;
    let upstream_request = UpstreamRequest {
        method: method.clone(),
        replica: replica.authority.clone(),
        path,
        query,
        headers: parts.headers,
        body,
        user_id: claims.map(|c| c.sub),
    };

    let upstream = match state.forwarder.forward(upstream_request).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                group = %route.group,
                replica = %replica,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(&route.group, e.kind());
            return Err(e.into());
        }
    };

    tracing::debug!(
        request_id = %request_id,
        group = %route.group,
        replica = %replica,
        status = %upstream.status,
        "Upstream responded"
    );

    // 5. Store successful cacheable responses
    match (cache, signature) {
        (Some(cache), Some(signature)) => {
            if upstream.status == StatusCode::OK {
                cache.put(signature, upstream.body.clone(), upstream.content_type.clone());
            }
            Ok(response::relay(upstream, Some(CacheStatus::Miss)))
        }
        _ => Ok(response::relay(upstream, None)),
    }
}
