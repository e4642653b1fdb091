//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google ID token verification with a cached signing-key table
//! - Session JWT issuance and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod google;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use google::{GoogleKeyCache, GoogleTokenVerifier, HttpKeySource};
pub use routes::auth_routes;
pub use session::SessionKeys;
