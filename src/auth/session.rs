//! Local session tokens: HS256 JWTs signed with the server secret
//!
//! Tokens are stateless. Validity is decided by signature and `exp` only;
//! there is no server-side revocation list.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use thiserror::Error;

use super::models::SessionClaims;
use crate::common::config::Settings;
use crate::common::ApiError;
use crate::users::models::UserRole;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing bearer token")]
    Missing,

    #[error("invalid session token")]
    Invalid,

    #[error("session token has expired")]
    Expired,

    #[error("failed to sign session token: {0}")]
    Signing(String),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Missing => ApiError::Unauthorized("missing auth".to_string()),
            SessionError::Invalid => ApiError::Unauthorized("invalid token".to_string()),
            SessionError::Expired => ApiError::Unauthorized("token has expired".to_string()),
            SessionError::Signing(msg) => ApiError::InternalServer(msg),
        }
    }
}

/// Signing and verification keys for session tokens, plus their lifetime
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.jwt_secret, settings.jwt_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id` valid from now for the configured TTL
    pub fn issue(&self, user_id: &str, role: UserRole) -> Result<String, SessionError> {
        self.issue_at(user_id, role, Utc::now().timestamp())
    }

    /// Sign a token as if issued at `issued_at` (unix seconds)
    pub fn issue_at(
        &self,
        user_id: &str,
        role: UserRole,
        issued_at: i64,
    ) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            role,
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Check signature and expiry. Pure computation, no I/O.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })?
            .claims;

        // `exp` is exclusive: a token is dead at its expiry second
        if claims.exp <= Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }
}
