//! # Auth Module
//!
//! This module handles the backend half of the authentication bridge:
//! - ID token verification against the identity provider
//! - Session termination (whole-account revocation)
//! - Profile mutation (display name / photo URL)
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::VerifiedUser;
pub use routes::auth_routes;
