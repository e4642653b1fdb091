//! Login flow: Google ID token in, local session token out

use tracing::{debug, info};

use super::models::AuthResponse;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::users::store::UserStore;

/// Verify `id_token`, find or create the user it names, and issue a session
///
/// Nothing is written unless the Google token verifies. The user row is
/// created at most once per Google subject, even under concurrent logins.
pub async fn login_with_google(state: &AppState, id_token: &str) -> Result<AuthResponse, ApiError> {
    let identity = state.google.verify(id_token).await.map_err(|e| {
        info!(error = %e, "Google ID token rejected");
        ApiError::from(e)
    })?;

    debug!(
        email = %safe_email_log(&identity.email),
        provider_id = %identity.subject_id,
        "Google token validation successful, proceeding with user lookup"
    );

    let outcome = UserStore::new(state.db.clone())
        .upsert_google_user(&identity)
        .await?;
    let user = outcome.user;

    if outcome.created {
        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "New user account created via Google sign-in"
        );
    }

    let access_token = state.sessions.issue(&user.id, user.role)?;

    info!(
        user_id = %user.id,
        role = %user.role,
        expires_in_secs = state.sessions.ttl().as_secs(),
        "User authentication successful via Google sign-in"
    );

    Ok(AuthResponse::bearer(access_token, user.id))
}
