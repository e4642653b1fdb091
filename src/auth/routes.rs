//! Authentication routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /auth/google` - exchange a Google ID token for a session token
pub fn auth_routes() -> Router {
    Router::new().route("/auth/google", post(handlers::google_auth))
}
