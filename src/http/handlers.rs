//! Endpoints served by the gateway itself.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::PublicUser;
use crate::cache::CacheStats;
use crate::error::GatewayError;
use crate::http::request::buffer_body;
use crate::http::server::GatewayState;
use crate::load_balancer::GroupStats;
use crate::routing::LocalEndpoint;

const SERVICE_NAME: &str = "edge-gateway";

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub user_id: String,
    pub username: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct GatewayStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub users: usize,
    pub cache: Option<CacheStats>,
    pub load_balancer: BTreeMap<String, GroupStats>,
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: BTreeMap<String, Vec<String>>,
}

/// Dispatch a matched local endpoint.
pub async fn handle(
    endpoint: LocalEndpoint,
    state: &GatewayState,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    match endpoint {
        LocalEndpoint::Register => register(state, request).await,
        LocalEndpoint::Login => login(state, request).await,
        LocalEndpoint::Status => Ok(Json(status(state)).into_response()),
        LocalEndpoint::Metrics => metrics(state),
        LocalEndpoint::Index => Ok(Json(index(state)).into_response()),
    }
}

async fn read_credentials(state: &GatewayState, request: Request<Body>) -> Result<CredentialsBody, GatewayError> {
    let body = buffer_body(request.into_body(), state.max_body_bytes).await?;
    serde_json::from_slice(&body)
        .map_err(|e| GatewayError::Validation(format!("invalid request body: {}", e)))
}

async fn register(state: &GatewayState, request: Request<Body>) -> Result<Response, GatewayError> {
    let body = read_credentials(state, request).await?;
    let user = state.credentials.register(&body.username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))).into_response())
}

async fn login(state: &GatewayState, request: Request<Body>) -> Result<Response, GatewayError> {
    let body = read_credentials(state, request).await?;
    let user = match state.credentials.verify(&body.username, &body.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(username = %body.username.trim(), "Login rejected");
            return Err(e.into());
        }
    };
    let issued = state.tokens.issue(&user.id, &user.username)?;

    tracing::info!(user_id = %user.id, expires_at = issued.expires_at, "Token issued");
    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "bearer",
        user_id: user.id,
        username: user.username,
        expires_at: issued.expires_at,
    })
    .into_response())
}

fn status(state: &GatewayState) -> GatewayStatus {
    GatewayStatus {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        users: state.credentials.len(),
        cache: state.cache.as_ref().map(|c| c.stats()),
        load_balancer: state.upstreams.stats(),
    }
}

fn metrics(state: &GatewayState) -> Result<Response, GatewayError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| GatewayError::RouteNotFound("/metrics".to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}

fn index(state: &GatewayState) -> ServiceIndex {
    let mut endpoints = BTreeMap::new();
    endpoints.insert(
        "auth".to_string(),
        vec!["/auth/register".to_string(), "/auth/login".to_string()],
    );
    for route in state.routes.upstream_routes() {
        endpoints.insert(route.group.clone(), vec![format!("{}/...", route.prefix())]);
    }
    endpoints.insert(
        "monitoring".to_string(),
        vec!["/status".to_string(), "/metrics".to_string()],
    );

    ServiceIndex {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "/status",
        endpoints,
    }
}
