//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::common::{safe_token_log, ApiError, AppState};

/// Authenticated caller extractor
///
/// Resolves the bearer token to the caller's identity id by verifying it
/// against the identity provider, or rejects the request with 401 before
/// any handler runs. The verified credential is kept so handlers acting on
/// the caller's behalf never use a stale token.
#[derive(Debug)]
pub struct AuthedUser {
    pub uid: String,
    pub id_token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Extension containing the AppState
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let identity = state_lock.read().await.identity.clone();

        // Extract Bearer token from Authorization header
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized {
                    error: "missing auth".to_string(),
                    message: None,
                });
            }
        };

        // Handle "Bearer <token>" format or raw token
        let bare_token = match token.strip_prefix("Bearer ") {
            Some(rest) => rest.to_string(),
            None => token,
        };

        if bare_token.is_empty() {
            warn!("Authentication failed: empty bearer token");
            return Err(ApiError::Unauthorized {
                error: "missing auth".to_string(),
                message: None,
            });
        }

        let uid = identity.verify_id_token(&bare_token).await.map_err(|e| {
            warn!(
                error = %e,
                token = %safe_token_log(&bare_token),
                "Bearer token verification failed"
            );
            ApiError::from(e)
        })?;

        debug!(uid = %uid, "Caller authenticated via extractor");

        Ok(AuthedUser {
            uid,
            id_token: bare_token,
        })
    }
}
