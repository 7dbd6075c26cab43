// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::services::identity::IdentityError;

/// API error types
///
/// The taxonomy is deliberately small: `InvalidRequest` for malformed
/// input (400), `Unauthorized` for credentials the identity provider will
/// not accept (401), and `Provider` for upstream failures that are not the
/// caller's fault (500).
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Unauthorized {
        error: String,
        message: Option<String>,
    },
    Provider(IdentityError),
    InternalServer(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized { error, message } => match message {
                Some(m) => write!(f, "Unauthorized: {} ({})", error, m),
                None => write!(f, "Unauthorized: {}", error),
            },
            ApiError::Provider(e) => write!(f, "Provider Error: {}", e),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, detail) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized { error, message } => {
                (StatusCode::UNAUTHORIZED, error, message)
            }
            ApiError::Provider(e) => {
                error!(error = %e, "Identity provider error surfaced to caller");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Identity provider request failed".to_string(),
                    Some(e.to_string()),
                )
            }
            ApiError::InternalServer(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let error_response = ErrorResponse {
            error: error_message,
            message: detail,
        };

        (status, Json(error_response)).into_response()
    }
}

/// Map provider-client failures onto the HTTP taxonomy: a rejected or
/// unknown credential is the caller's problem (401); everything else is an
/// upstream failure (500).
impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidToken(message) => ApiError::Unauthorized {
                error: "Invalid ID token".to_string(),
                message: Some(message),
            },
            IdentityError::AccountNotFound(uid) => ApiError::Unauthorized {
                error: "Unknown account".to_string(),
                message: Some(uid),
            },
            other => ApiError::Provider(other),
        }
    }
}
