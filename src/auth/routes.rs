//! Authentication routes

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/verify` - ID token verification
/// - `GET /api/auth/user` - Current authenticated user
/// - `PUT /api/auth/profile` - Partial profile update
/// - `POST /api/auth/logout` - Revoke all sessions for the caller
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/verify", post(handlers::verify_handler))
        .route("/api/auth/user", get(handlers::user_handler))
        .route("/api/auth/profile", put(handlers::update_profile_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
}
