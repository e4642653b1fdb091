//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::session::SessionError;
use crate::common::{safe_token_log, ApiError, AppState};
use crate::users::models::UserRole;

/// Authenticated caller, taken from a verified session token
///
/// Extraction checks the bearer token's signature and expiry only; it does
/// not touch the database. Handlers that need the stored profile load it
/// themselves.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub role: UserRole,
}

impl AuthedUser {
    /// Fails with `Forbidden` unless the caller is a trainer
    pub fn require_trainer(&self) -> Result<(), ApiError> {
        if self.role == UserRole::Trainer {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "Trainer role required");
            Err(ApiError::Forbidden("Only trainers can perform this action".to_string()))
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let header = match parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
            Some(h) => h,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(SessionError::Missing.into());
            }
        };

        let token = bearer_token(header).ok_or_else(|| {
            warn!("Authentication failed: Authorization header is not a bearer token");
            ApiError::from(SessionError::Invalid)
        })?;

        let claims = app_state.sessions.verify(token).map_err(|e| {
            warn!(error = %e, token = %safe_token_log(token), "Session token validation failed");
            ApiError::from(e)
        })?;

        debug!(user_id = %claims.sub, role = %claims.role, "Session token accepted");

        Ok(AuthedUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}
