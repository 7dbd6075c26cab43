// src/services/identity.rs
//! Client for the identity provider's admin REST API.
//!
//! The provider is the system of record for accounts and session
//! credentials. This service only reads and forwards account data, with two
//! exceptions: partial profile updates and whole-account session
//! revocation, both on behalf of an already-authenticated caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid ID token: {0}")]
    InvalidToken(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("identity provider request failed: {0}")]
    RequestFailed(String),

    #[error("identity provider returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Account record as returned by the identity provider's admin API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in: Option<DateTime<Utc>>,
}

/// Partial profile update. Absent fields are left unchanged by the provider.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileChanges {
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Server-side seam to the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate a session credential and return the identity id embedded in it.
    async fn verify_id_token(&self, id_token: &str) -> Result<String, IdentityError>;

    /// Fetch the full account record for an identity id.
    async fn get_user(&self, uid: &str) -> Result<ProviderUser, IdentityError>;

    /// Apply a partial profile update to the account record.
    async fn update_account(&self, uid: &str, changes: &ProfileChanges)
        -> Result<(), IdentityError>;

    /// Revoke all outstanding refresh/session material for the account.
    /// Previously issued credentials become unusable once they expire or
    /// are next checked. Not blindly retried on failure.
    async fn revoke_refresh_tokens(&self, uid: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone)]
pub struct RestIdentityProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RestIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the human-readable detail out of a provider error body,
    /// falling back to the raw payload when the shape is unexpected.
    async fn error_detail(resp: reqwest::Response) -> String {
        match resp.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
            Err(_) => "no error detail from provider".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<String, IdentityError> {
        debug!("Submitting ID token to identity provider for verification");

        let resp = self
            .client
            .post(self.url("/v1/tokens:verify"))
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting identity provider verification endpoint");
                IdentityError::RequestFailed(e.to_string())
            })?;

        let status = resp.status();
        if status.is_success() {
            #[derive(Deserialize)]
            struct VerifyResponse {
                uid: String,
            }

            let body: VerifyResponse = resp
                .json()
                .await
                .map_err(|e| IdentityError::MalformedResponse(e.to_string()))?;
            debug!(uid = %body.uid, "Identity provider accepted ID token");
            Ok(body.uid)
        } else if status.is_client_error() {
            let detail = Self::error_detail(resp).await;
            warn!(http_status = %status, detail = %detail, "Identity provider rejected ID token");
            Err(IdentityError::InvalidToken(detail))
        } else {
            let detail = Self::error_detail(resp).await;
            error!(
                http_status = %status,
                detail = %detail,
                "Identity provider verification returned server error"
            );
            Err(IdentityError::RequestFailed(detail))
        }
    }

    async fn get_user(&self, uid: &str) -> Result<ProviderUser, IdentityError> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/accounts/{}", uid)))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, uid = %uid, "HTTP error fetching account record");
                IdentityError::RequestFailed(e.to_string())
            })?;

        let status = resp.status();
        if status.is_success() {
            resp.json::<ProviderUser>()
                .await
                .map_err(|e| IdentityError::MalformedResponse(e.to_string()))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            warn!(uid = %uid, "Account not found at identity provider");
            Err(IdentityError::AccountNotFound(uid.to_string()))
        } else {
            let detail = Self::error_detail(resp).await;
            error!(http_status = %status, uid = %uid, detail = %detail, "Account lookup failed");
            Err(IdentityError::RequestFailed(detail))
        }
    }

    async fn update_account(
        &self,
        uid: &str,
        changes: &ProfileChanges,
    ) -> Result<(), IdentityError> {
        debug!(
            uid = %uid,
            has_display_name = changes.display_name.is_some(),
            has_photo_url = changes.photo_url.is_some(),
            "Applying profile changes at identity provider"
        );

        let resp = self
            .client
            .patch(self.url(&format!("/v1/accounts/{}", uid)))
            .query(&[("key", self.api_key.as_str())])
            .json(changes)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, uid = %uid, "HTTP error applying profile changes");
                IdentityError::RequestFailed(e.to_string())
            })?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(IdentityError::AccountNotFound(uid.to_string()))
        } else {
            let detail = Self::error_detail(resp).await;
            error!(http_status = %status, uid = %uid, detail = %detail, "Profile update failed");
            Err(IdentityError::RequestFailed(detail))
        }
    }

    async fn revoke_refresh_tokens(&self, uid: &str) -> Result<(), IdentityError> {
        let resp = self
            .client
            .post(self.url(&format!("/v1/accounts/{}:revokeTokens", uid)))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, uid = %uid, "HTTP error revoking sessions");
                IdentityError::RequestFailed(e.to_string())
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(uid = %uid, "Identity provider revoked all sessions");
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(IdentityError::AccountNotFound(uid.to_string()))
        } else {
            let detail = Self::error_detail(resp).await;
            error!(http_status = %status, uid = %uid, detail = %detail, "Session revocation failed");
            Err(IdentityError::RequestFailed(detail))
        }
    }
}
