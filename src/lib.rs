//! Authentication bridge for the Flowlane platform.
//!
//! The backend half (served by the `api` binary) verifies identity-provider
//! credentials, terminates sessions, and applies profile mutations. The
//! client half ([`session`]) is the session controller consumed by the
//! application shell: it reacts to provider session-change events, performs
//! the verification round-trip, and holds the single source of truth for
//! the current user.

pub mod auth;
pub mod common;
pub mod logging_middleware;
pub mod services;
pub mod session;
