//! Gateway error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::{CredentialError, TokenError};
use crate::forward::ForwardError;
use crate::load_balancer::SelectorError;

/// Every failure a client can observe.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Auth(TokenError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("no route for {0}")]
    RouteNotFound(String),
    #[error("username already exists")]
    Conflict,
    #[error(transparent)]
    Upstream(#[from] ForwardError),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) | GatewayError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict => StatusCode::CONFLICT,
            GatewayError::Upstream(ForwardError::Unreachable { .. }) => StatusCode::BAD_GATEWAY,
            GatewayError::Upstream(ForwardError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Token, upstream and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Auth(_) => "invalid or missing token".to_string(),
            GatewayError::Upstream(ForwardError::Unreachable { .. }) => "upstream service unavailable".to_string(),
            GatewayError::Upstream(ForwardError::Timeout { .. }) => "upstream service timed out".to_string(),
            GatewayError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(reason) => GatewayError::Internal(reason),
            other => GatewayError::Auth(other),
        }
    }
}

impl From<CredentialError> for GatewayError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateUsername => GatewayError::Conflict,
            CredentialError::InvalidInput(reason) => GatewayError::Validation(reason),
            CredentialError::InvalidCredentials => GatewayError::InvalidCredentials,
            CredentialError::Hashing(reason) => GatewayError::Internal(reason),
        }
    }
}

impl From<SelectorError> for GatewayError {
    fn from(err: SelectorError) -> Self {
        // Groups are validated at startup, so any selector failure here is a bug.
        GatewayError::Internal(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
