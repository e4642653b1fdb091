//! Authentication data models

use serde::{Deserialize, Serialize};

use crate::users::models::UserRole;

/// Claims carried by the locally issued session JWT
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Claims read from a Google ID token after signature verification
#[derive(Deserialize, Debug)]
pub struct GoogleIdTokenClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Identity asserted by a verified Google ID token. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    /// The client id the token was issued for
    pub audience: String,
}

/// POST /auth/google request body
#[derive(Deserialize, Debug)]
pub struct GoogleAuthRequest {
    pub id_token: String,
}

/// POST /auth/google response body
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
}

impl AuthResponse {
    pub fn bearer(access_token: String, user_id: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user_id,
        }
    }
}
