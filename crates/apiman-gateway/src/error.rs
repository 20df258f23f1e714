//! Gateway error types

use apiman_kernel::gateway::AuthError;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single backend call.  Never retried.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend could not be reached (connection refused, DNS, reset…).
    #[error("backend '{backend}' is unreachable: {source}")]
    BackendUnreachable {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend did not answer within the configured bound.
    #[error("backend '{backend}' did not respond within {timeout_ms} ms")]
    BackendTimeout { backend: String, timeout_ms: u64 },

    /// The backend answered, but the answer could not be relayed.
    #[error("backend '{backend}' failed: {message}")]
    BackendError {
        backend: String,
        status: Option<u16>,
        message: String,
    },
}

/// Request-level errors, rendered as `{"error": {"code", "message"}}`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Machine-readable reason carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Auth(AuthError::Denied { .. }) => "PERMISSION_DENIED",
            GatewayError::Auth(_) => "UNAUTHORIZED",
            GatewayError::Forward(ForwardError::BackendUnreachable { .. }) => {
                "BACKEND_UNREACHABLE"
            }
            GatewayError::Forward(ForwardError::BackendTimeout { .. }) => "BACKEND_TIMEOUT",
            GatewayError::Forward(ForwardError::BackendError { .. }) => "BACKEND_ERROR",
            GatewayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(AuthError::Denied { .. }) => StatusCode::FORBIDDEN,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forward(ForwardError::BackendTimeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GatewayError::Forward(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Fatal errors raised while assembling or running the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid server settings: {0}")]
    Settings(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),
}
