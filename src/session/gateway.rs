//! Abstraction over the identity provider's client SDK.
//!
//! The SDK's callback/listener model is kept as-is: a session-change
//! subscription that fires with the current credential (or `None` when
//! signed out upstream), plus interactive sign-in and local sign-out.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("interactive sign-in failed: {0}")]
    SignInFailed(String),

    #[error("sign-out failed: {0}")]
    SignOutFailed(String),
}

/// Callback invoked on every session change. `Some(token)` carries the
/// live session's credential; `None` means the provider signed out.
pub type SessionChangeHandler = Box<dyn Fn(Option<String>) + Send + Sync>;

/// Subscription handle returned by [`AuthGateway::on_session_change`].
/// Dropping it unsubscribes the listener.
pub struct ListenerGuard {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerGuard {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Client-side seam to the identity provider.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Register a session-change listener. The handler fires with the
    /// current credential on sign-in and token rotation, and with `None`
    /// on upstream sign-out.
    fn on_session_change(&self, handler: SessionChangeHandler) -> ListenerGuard;

    /// Open the provider's interactive sign-in. Resolving does not mean
    /// the user is visible yet; that arrives through the session-change
    /// listener once the provider emits the new session.
    async fn sign_in(&self) -> Result<(), GatewayError>;

    /// Clear the provider's local session.
    async fn sign_out(&self) -> Result<(), GatewayError>;
}
