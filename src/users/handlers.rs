//! User handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::warn;

use super::models::UserRead;
use super::store::UserStore;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /api/v1/users/me
/// Returns the current authenticated user's profile, with the trainer
/// profile when one exists
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<UserRead>, ApiError> {
    let store = UserStore::new(state.db.clone());

    let user = match store.find_by_id(&authed.id).await? {
        Some(u) => u,
        None => {
            warn!(user_id = %authed.id, "Session token names a user that no longer exists");
            return Err(ApiError::NotFound("User not found".to_string()));
        }
    };

    let trainer_profile = store.find_trainer_profile(&user.id).await?;

    Ok(Json(UserRead::new(user, trainer_profile)))
}
