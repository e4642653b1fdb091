// src/app/mod.rs
//! Router composition: API routes, shared state and HTTP middleware

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::auth_routes;
use crate::common::AppState;
use crate::logging_middleware;
use crate::users::users_routes;
use crate::workshops::workshops_routes;


pub const API_PREFIX: &str = "/api/v1";

/// Build the full application router around `state`
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth_routes())
        // ====================================================================
        // USER ROUTES
        // ====================================================================
        .merge(users_routes())
        // ====================================================================
        // WORKSHOP ROUTES
        // ====================================================================
        .merge(workshops_routes());

    let mut app = Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, api);

    if state.settings.debug {
        info!("DEBUG enabled: logging request and response bodies");
        app = app.layer(middleware::from_fn(logging_middleware::log_request_response));
    }

    let cors = cors_layer(&state.settings.cors_origins);

    app.layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `*` allows any origin without credentials; an explicit list allows
/// credentials for those origins only
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}
