//! Persistence for workshops

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{error, info};

use super::models::{NewWorkshop, Workshop};
use crate::common::{format_timestamp, generate_workshop_id, now_timestamp, ApiError};

const WORKSHOP_COLUMNS: &str =
    "id, trainer_id, title, description, start_time, duration_minutes, price, max_participants, created_at";

pub struct WorkshopStore {
    db: SqlitePool,
}

impl WorkshopStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Workshops starting at or after `now`, soonest first
    pub async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Workshop>, ApiError> {
        sqlx::query_as::<_, Workshop>(&format!(
            "SELECT {} FROM workshops WHERE start_time >= ? ORDER BY start_time ASC, id ASC",
            WORKSHOP_COLUMNS
        ))
        .bind(format_timestamp(now))
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn create(&self, trainer_id: &str, workshop: NewWorkshop) -> Result<Workshop, ApiError> {
        let id = generate_workshop_id();

        let result = sqlx::query(
            r#"
            INSERT INTO workshops
                (id, trainer_id, title, description, start_time, duration_minutes, price, max_participants, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(trainer_id)
        .bind(&workshop.title)
        .bind(&workshop.description)
        .bind(&workshop.start_time)
        .bind(workshop.duration_minutes)
        .bind(&workshop.price)
        .bind(workshop.max_participants)
        .bind(now_timestamp())
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            // The session outlived its user row
            if is_foreign_key_violation(&e) {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
            error!(error = %e, trainer_id = %trainer_id, "Failed to insert workshop");
            return Err(ApiError::DatabaseError(e));
        }

        info!(workshop_id = %id, trainer_id = %trainer_id, "Workshop created");

        sqlx::query_as::<_, Workshop>(&format!(
            "SELECT {} FROM workshops WHERE id = ?",
            WORKSHOP_COLUMNS
        ))
        .bind(&id)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.message().contains("FOREIGN KEY constraint failed"))
        .unwrap_or(false)
}
