//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use super::models::{AuthResponse, GoogleAuthRequest};
use super::services;
use crate::common::{ApiError, AppState};

/// POST /api/v1/auth/google
/// Exchanges a Google ID token, obtained by the app's sign-in flow, for a
/// local session token
///
/// # Request Body
/// ```json
/// { "id_token": "<google id token>" }
/// ```
///
/// # Response
/// ```json
/// { "access_token": "<jwt>", "token_type": "bearer", "user_id": "U_..." }
/// ```
pub async fn google_auth(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GoogleAuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("Received Google auth request");

    // An empty token is just another malformed one: verification rejects it
    let response = services::login_with_google(&state, payload.id_token.trim()).await?;
    Ok(Json(response))
}
