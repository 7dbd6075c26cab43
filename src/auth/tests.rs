//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - Verified user view serialization contract
//! - Token verification, profile mutation, and session termination handlers
//! - AuthedUser extractor behavior
//! - ApiError status mapping

#[cfg(test)]
mod tests {
    use super::super::*;
    use async_trait::async_trait;
    use axum::extract::{Extension, FromRequestParts, Json};
    use axum::http::header::AUTHORIZATION;
    use axum::response::IntoResponse;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    use crate::common::{ApiError, AppState};
    use crate::services::identity::{
        IdentityError, IdentityProvider, ProfileChanges, ProviderUser,
    };
    use super::super::models::{UpdateProfileRequest, VerifyTokenPayload};

    // ============================================================================
    // Test Support
    // ============================================================================

    struct MockProvider {
        tokens: HashMap<String, String>,
        accounts: Mutex<HashMap<String, ProviderUser>>,
        update_calls: AtomicUsize,
        revoke_calls: AtomicUsize,
        fail_revoke: bool,
    }

    impl MockProvider {
        fn with_account(token: &str, account: ProviderUser) -> Self {
            let mut tokens = HashMap::new();
            tokens.insert(token.to_string(), account.uid.clone());
            let mut accounts = HashMap::new();
            accounts.insert(account.uid.clone(), account);
            MockProvider {
                tokens,
                accounts: Mutex::new(accounts),
                update_calls: AtomicUsize::new(0),
                revoke_calls: AtomicUsize::new(0),
                fail_revoke: false,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for MockProvider {
        async fn verify_id_token(&self, id_token: &str) -> Result<String, IdentityError> {
            self.tokens
                .get(id_token)
                .cloned()
                .ok_or_else(|| IdentityError::InvalidToken("token rejected".to_string()))
        }

        async fn get_user(&self, uid: &str) -> Result<ProviderUser, IdentityError> {
            self.accounts
                .lock()
                .unwrap()
                .get(uid)
                .cloned()
                .ok_or_else(|| IdentityError::AccountNotFound(uid.to_string()))
        }

        async fn update_account(
            &self,
            uid: &str,
            changes: &ProfileChanges,
        ) -> Result<(), IdentityError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(uid)
                .ok_or_else(|| IdentityError::AccountNotFound(uid.to_string()))?;
            if let Some(name) = &changes.display_name {
                account.display_name = Some(name.clone());
            }
            if let Some(photo) = &changes.photo_url {
                account.photo_url = Some(photo.clone());
            }
            Ok(())
        }

        async fn revoke_refresh_tokens(&self, uid: &str) -> Result<(), IdentityError> {
            self.revoke_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_revoke {
                return Err(IdentityError::RequestFailed("provider outage".to_string()));
            }
            self.accounts
                .lock()
                .unwrap()
                .get(uid)
                .map(|_| ())
                .ok_or_else(|| IdentityError::AccountNotFound(uid.to_string()))
        }
    }

    fn account(uid: &str, email: &str) -> ProviderUser {
        ProviderUser {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            display_name: Some("Test User".to_string()),
            photo_url: Some("https://cdn.flowlane.dev/p1.png".to_string()),
            email_verified: true,
            created_at: None,
            last_sign_in: None,
        }
    }

    fn app_state(provider: Arc<MockProvider>) -> Extension<Arc<RwLock<AppState>>> {
        Extension(Arc::new(RwLock::new(AppState { identity: provider })))
    }

    fn authed(uid: &str, token: &str) -> AuthedUser {
        AuthedUser {
            uid: uid.to_string(),
            id_token: token.to_string(),
        }
    }

    async fn response_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    // ============================================================================
    // Model Tests
    // ============================================================================

    #[test]
    fn test_verified_user_serializes_with_contract_field_names() {
        let user: VerifiedUser = account("u1", "a@b.com").into();
        let json = serde_json::to_value(&user).expect("serialize");

        assert_eq!(json["uid"], "u1");
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["displayName"], "Test User");
        assert_eq!(json["photoURL"], "https://cdn.flowlane.dev/p1.png");
        assert_eq!(json["emailVerified"], true);
        assert!(json.as_object().unwrap().contains_key("createdAt"));
        assert!(json.as_object().unwrap().contains_key("lastSignIn"));
        // The backend never emits the credential; it is attached client-side
        assert!(!json.as_object().unwrap().contains_key("idToken"));
    }

    #[test]
    fn test_verified_user_with_token_attaches_credential() {
        let user: VerifiedUser = account("u1", "a@b.com").into();
        let user = user.with_token("tok-123");
        let json = serde_json::to_value(&user).expect("serialize");
        assert_eq!(json["idToken"], "tok-123");
    }

    #[test]
    fn test_verify_payload_accepts_missing_token() {
        let payload: VerifyTokenPayload = serde_json::from_str("{}").expect("parse");
        assert!(payload.id_token.is_none());

        let payload: VerifyTokenPayload =
            serde_json::from_str(r#"{"idToken": "abc"}"#).expect("parse");
        assert_eq!(payload.id_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_update_profile_request_parses_partial_body() {
        let request: UpdateProfileRequest =
            serde_json::from_str(r#"{"displayName": "X"}"#).expect("parse");
        assert_eq!(request.display_name.as_deref(), Some("X"));
        assert!(request.photo_url.is_none());

        let request: UpdateProfileRequest = serde_json::from_str("{}").expect("parse");
        assert!(request.display_name.is_none() && request.photo_url.is_none());
    }

    // ============================================================================
    // Handler Tests
    // ============================================================================

    #[tokio::test]
    async fn test_verify_missing_token_is_rejected_with_400() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let result = handlers::verify_handler(
            app_state(provider),
            Json(VerifyTokenPayload { id_token: None }),
        )
        .await;

        let err = result.expect_err("missing token must fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::BAD_REQUEST);
        let body = response_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "ID token is required"}));
    }

    #[tokio::test]
    async fn test_verify_empty_token_is_rejected_with_400() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let result = handlers::verify_handler(
            app_state(provider),
            Json(VerifyTokenPayload {
                id_token: Some(String::new()),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_verify_valid_token_returns_normalized_user() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let Json(body) = handlers::verify_handler(
            app_state(provider),
            Json(VerifyTokenPayload {
                id_token: Some("tok-u1".to_string()),
            }),
        )
        .await
        .expect("verification succeeds");

        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["uid"], "u1");
        assert_eq!(body["user"]["email"], "a@b.com");
        assert!(!body["user"].as_object().unwrap().contains_key("idToken"));
    }

    #[tokio::test]
    async fn test_verify_invalid_token_is_unauthorized() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let result = handlers::verify_handler(
            app_state(provider),
            Json(VerifyTokenPayload {
                id_token: Some("expired".to_string()),
            }),
        )
        .await;

        let err = result.expect_err("invalid token must fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::UNAUTHORIZED);
        let body = response_json(resp).await;
        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_user_handler_returns_current_account() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let Json(body) = handlers::user_handler(app_state(provider), authed("u1", "tok-u1"))
            .await
            .expect("lookup succeeds");

        assert_eq!(body["user"]["uid"], "u1");
    }

    #[tokio::test]
    async fn test_profile_update_applies_only_provided_fields() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let Json(body) = handlers::update_profile_handler(
            app_state(provider.clone()),
            authed("u1", "tok-u1"),
            Json(UpdateProfileRequest {
                display_name: Some("Renamed".to_string()),
                photo_url: None,
            }),
        )
        .await
        .expect("update succeeds");

        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["displayName"], "Renamed");
        // Absent field is left unchanged
        assert_eq!(body["user"]["photoURL"], "https://cdn.flowlane.dev/p1.png");
        assert_eq!(provider.update_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_profile_update_is_noop_returning_current_user() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let Json(body) = handlers::update_profile_handler(
            app_state(provider.clone()),
            authed("u1", "tok-u1"),
            Json(UpdateProfileRequest::default()),
        )
        .await
        .expect("empty update succeeds");

        assert_eq!(body["user"]["displayName"], "Test User");
        assert_eq!(provider.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logout_revokes_all_sessions() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let Json(body) = handlers::logout_handler(app_state(provider.clone()), authed("u1", "tok-u1"))
            .await
            .expect("logout succeeds");

        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Logout successful");
        assert_eq!(provider.revoke_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_twice_succeeds_per_call() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        for _ in 0..2 {
            handlers::logout_handler(app_state(provider.clone()), authed("u1", "tok-u1"))
                .await
                .expect("revocation reported per call");
        }
        assert_eq!(provider.revoke_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_logout_reports_provider_failure_as_500() {
        let mut provider = MockProvider::with_account("tok-u1", account("u1", "a@b.com"));
        provider.fail_revoke = true;
        let result =
            handlers::logout_handler(app_state(Arc::new(provider)), authed("u1", "tok-u1")).await;

        let err = result.expect_err("revocation failure must surface");
        let resp = err.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ============================================================================
    // Extractor Tests
    // ============================================================================

    #[tokio::test]
    async fn test_extractor_resolves_bearer_token_to_uid() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let state = Arc::new(RwLock::new(AppState { identity: provider }));

        let request = axum::http::Request::builder()
            .uri("/api/auth/user")
            .header(AUTHORIZATION, "Bearer tok-u1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        parts.extensions.insert(state);

        let authed = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .expect("valid bearer token");
        assert_eq!(authed.uid, "u1");
        assert_eq!(authed.id_token, "tok-u1");
    }

    #[tokio::test]
    async fn test_extractor_rejects_missing_authorization_header() {
        let provider = Arc::new(MockProvider::with_account("tok-u1", account("u1", "a@b.com")));
        let state = Arc::new(RwLock::new(AppState { identity: provider }));

        let request = axum::http::Request::builder()
            .uri("/api/auth/user")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        parts.extensions.insert(state);

        let result = AuthedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    }

    // ============================================================================
    // Error Mapping Tests
    // ============================================================================

    #[test]
    fn test_api_error_status_mapping() {
        let cases = [
            (
                ApiError::InvalidRequest("bad".to_string()),
                axum::http::StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Unauthorized {
                    error: "no".to_string(),
                    message: None,
                },
                axum::http::StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Provider(IdentityError::RequestFailed("down".to_string())),
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::InternalServer("boom".to_string()),
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_identity_error_maps_invalid_token_to_unauthorized() {
        let err: ApiError = IdentityError::InvalidToken("expired".to_string()).into();
        assert!(matches!(err, ApiError::Unauthorized { .. }));

        let err: ApiError = IdentityError::RequestFailed("down".to_string()).into();
        assert!(matches!(err, ApiError::Provider(_)));
    }
}
