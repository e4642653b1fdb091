// src/workshops/handlers.rs

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use super::models::*;
use super::store::WorkshopStore;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /api/v1/workshops/ - Upcoming workshops, public
pub async fn list_workshops(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Workshop>>, ApiError> {
    let workshops = WorkshopStore::new(state.db.clone())
        .list_upcoming(Utc::now())
        .await?;

    debug!(count = workshops.len(), "Listed upcoming workshops");
    Ok(Json(workshops))
}

/// POST /api/v1/workshops/ - Create a workshop, trainers only
pub async fn create_workshop(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthedUser,
    Json(payload): Json<CreateWorkshop>,
) -> Result<(StatusCode, Json<Workshop>), ApiError> {
    user.require_trainer()?;

    info!(user_id = %user.id, title = %payload.title, "Creating workshop");

    let workshop = NewWorkshop::try_from(payload)?;
    let created = WorkshopStore::new(state.db.clone())
        .create(&user.id, workshop)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}
