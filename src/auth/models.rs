//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::identity::ProviderUser;

/// Normalized projection of a successfully verified identity.
///
/// The backend returns this view without `idToken`; the session controller
/// attaches the credential client-side so privileged calls always carry the
/// most recently verified token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl VerifiedUser {
    /// Attach the session credential that produced this view.
    pub fn with_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }
}

impl From<ProviderUser> for VerifiedUser {
    fn from(record: ProviderUser) -> Self {
        VerifiedUser {
            uid: record.uid,
            email: record.email,
            display_name: record.display_name,
            photo_url: record.photo_url,
            email_verified: record.email_verified,
            created_at: record.created_at,
            last_sign_in: record.last_sign_in,
            id_token: None,
        }
    }
}

/// Request body for `POST /api/auth/verify`.
///
/// The token is optional at the serde level so the handler, not the JSON
/// extractor, rejects a missing token with the documented 400 body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenPayload {
    pub id_token: Option<String>,
}

/// Request body for `PUT /api/auth/profile`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}
