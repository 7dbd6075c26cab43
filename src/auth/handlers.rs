//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::models::{UpdateProfileRequest, VerifiedUser, VerifyTokenPayload};
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};
use crate::services::identity::ProfileChanges;

/// POST /api/auth/verify
/// Verifies an identity-provider ID token and returns the normalized user view
///
/// # Request Body
/// ```json
/// {
///   "idToken": "<provider id token>"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "success": true,
///   "user": { ... },
///   "message": "Token verified successfully"
/// }
/// ```
pub async fn verify_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<VerifyTokenPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("🔐 Received token verification request");
    let identity = state_lock.read().await.identity.clone();

    let id_token = match payload.id_token.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            warn!("Verification request missing ID token");
            return Err(ApiError::InvalidRequest("ID token is required".to_string()));
        }
    };

    debug!(
        token = %safe_token_log(&id_token),
        "Submitting credential to identity provider"
    );

    // Any verification or lookup failure collapses to 401 here: a partial
    // user view is never returned, and the provider's message is kept for
    // diagnostics.
    let uid = match identity.verify_id_token(&id_token).await {
        Ok(uid) => uid,
        Err(e) => {
            warn!(
                error = %e,
                token = %safe_token_log(&id_token),
                "Identity provider rejected credential"
            );
            return Err(ApiError::Unauthorized {
                error: "Invalid ID token".to_string(),
                message: Some(e.to_string()),
            });
        }
    };

    let user: VerifiedUser = match identity.get_user(&uid).await {
        Ok(record) => record.into(),
        Err(e) => {
            warn!(error = %e, uid = %uid, "Account lookup failed after token verification");
            return Err(ApiError::Unauthorized {
                error: "Token verification failed".to_string(),
                message: Some(e.to_string()),
            });
        }
    };

    info!(
        uid = %user.uid,
        email = %safe_email_log(user.email.as_deref().unwrap_or_default()),
        "Token verification successful"
    );

    let resp = serde_json::json!({
        "success": true,
        "user": user,
        "message": "Token verified successfully",
    });

    Ok(Json(resp))
}

/// GET /api/auth/user
/// Returns the current authenticated caller's account record
///
/// # Response
/// ```json
/// {
///   "user": { ... }
/// }
/// ```
#[axum::debug_handler]
pub async fn user_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let identity = state_lock.read().await.identity.clone();

    let user: VerifiedUser = identity
        .get_user(&authed.uid)
        .await
        .map_err(|e| {
            error!(error = %e, uid = %authed.uid, "Account lookup failed for authenticated caller");
            ApiError::Provider(e)
        })?
        .into();

    Ok(Json(serde_json::json!({ "user": user })))
}

/// PUT /api/auth/profile
/// Applies a partial profile update to the caller's account record and
/// returns the updated user view. Absent fields are left unchanged; an
/// empty body is a no-op that still returns the current record.
pub async fn update_profile_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let identity = state_lock.read().await.identity.clone();

    info!(
        uid = %authed.uid,
        has_display_name = request.display_name.is_some(),
        has_photo_url = request.photo_url.is_some(),
        "Profile update request received"
    );

    let changes = ProfileChanges {
        display_name: request.display_name,
        photo_url: request.photo_url,
    };

    if changes.is_empty() {
        debug!(uid = %authed.uid, "Profile update carried no fields; returning current record");
    } else {
        identity
            .update_account(&authed.uid, &changes)
            .await
            .map_err(|e| {
                error!(error = %e, uid = %authed.uid, "Provider refused profile update");
                ApiError::Provider(e)
            })?;
    }

    // Re-fetch so the response reflects exactly what the provider stored
    let user: VerifiedUser = identity
        .get_user(&authed.uid)
        .await
        .map_err(|e| {
            error!(error = %e, uid = %authed.uid, "Account lookup failed after profile update");
            ApiError::Provider(e)
        })?
        .into();

    info!(uid = %authed.uid, "Profile updated successfully");

    Ok(Json(serde_json::json!({
        "success": true,
        "user": user,
    })))
}

/// POST /api/auth/logout
/// Revokes every outstanding session for the authenticated caller. The
/// revocation is reported, not retried, when the provider fails.
///
/// # Response
/// ```json
/// {
///   "success": true,
///   "message": "Logout successful"
/// }
/// ```
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let identity = state_lock.read().await.identity.clone();

    info!(uid = %authed.uid, "Session termination requested");

    identity
        .revoke_refresh_tokens(&authed.uid)
        .await
        .map_err(|e| {
            error!(error = %e, uid = %authed.uid, "Provider failed to revoke sessions");
            ApiError::Provider(e)
        })?;

    info!(uid = %authed.uid, "All sessions revoked");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Logout successful",
    })))
}
