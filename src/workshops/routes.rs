// src/workshops/routes.rs

use axum::{routing::get, Router};

use super::handlers;

/// Create the workshops router
pub fn workshops_routes() -> Router {
    Router::new()
        .route(
            "/workshops",
            get(handlers::list_workshops).post(handlers::create_workshop),
        )
        .route(
            "/workshops/",
            get(handlers::list_workshops).post(handlers::create_workshop),
        )
}
