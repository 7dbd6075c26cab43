//! # Session Module
//!
//! Client-side session controller for the application shell. It subscribes
//! to identity-provider session-change events, performs the verification
//! round-trip against the backend, and exposes a single reactive
//! current-user view. Nothing outside this module mutates session state.

pub mod backend;
pub mod controller;
pub mod gateway;


pub use backend::{BackendError, HttpSessionBackend, SessionBackend};
pub use controller::{SessionController, SessionState};
pub use gateway::{AuthGateway, GatewayError, ListenerGuard, SessionChangeHandler};
