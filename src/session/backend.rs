//! Verification round-trip against the backend auth endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::auth::VerifiedUser;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("verification rejected: {0}")]
    Rejected(String),

    #[error("backend request failed: {0}")]
    RequestFailed(String),
}

/// Client-side seam to the backend's verification and termination endpoints.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// `POST /api/auth/verify` round-trip. Returns the user view without
    /// `idToken`; the session controller attaches the credential.
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, BackendError>;

    /// `POST /api/auth/logout` round-trip: revokes every outstanding
    /// session for the credential's identity.
    async fn logout(&self, id_token: &str) -> Result<(), BackendError>;
}

pub struct HttpSessionBackend {
    base_url: String,
    client: Client,
}

impl HttpSessionBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct VerifyResponseBody {
    user: VerifiedUser,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    message: Option<String>,
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, BackendError> {
        debug!("Sending credential to backend for verification");

        let resp = self
            .client
            .post(format!("{}/api/auth/verify", self.base_url))
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let body: VerifyResponseBody = resp
                .json()
                .await
                .map_err(|e| BackendError::RequestFailed(e.to_string()))?;
            return Ok(body.user);
        }

        let detail = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.message.unwrap_or(b.error))
            .unwrap_or_else(|_| status.to_string());

        if status.is_client_error() {
            Err(BackendError::Rejected(detail))
        } else {
            Err(BackendError::RequestFailed(detail))
        }
    }

    async fn logout(&self, id_token: &str) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(format!("{}/api/auth/logout", self.base_url))
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::RequestFailed(format!(
                "logout returned {}",
                status
            )))
        }
    }
}
