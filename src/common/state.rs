// Application state shared across all modules

use std::sync::Arc;

use crate::services::identity::IdentityProvider;

/// Application state containing the identity-provider client.
///
/// Verified users are never persisted locally; every request re-verifies
/// against the provider, so the state carries no database pool.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
}
