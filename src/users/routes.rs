//! User routes

use axum::{routing::get, Router};

use super::handlers;

/// # Routes
/// - `GET /users/me` - current user's profile
pub fn users_routes() -> Router {
    Router::new().route("/users/me", get(handlers::me_handler))
}
