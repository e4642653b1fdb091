//! Persistence for users and trainer profiles

use sqlx::SqlitePool;
use tracing::{debug, error, warn};

use super::models::{TrainerProfile, UpsertOutcome, User, UserRole};
use crate::auth::models::VerifiedIdentity;
use crate::common::{generate_user_id, now_timestamp, ApiError};

/// Attempts before a first-login upsert gives up on transient conflicts
const MAX_UPSERT_ATTEMPTS: usize = 3;

const USER_COLUMNS: &str =
    "id, google_id, email, full_name, picture_url, is_active, role, created_at";

pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Database error during user lookup");
                ApiError::DatabaseError(e)
            })
    }

    pub async fn find_trainer_profile(&self, user_id: &str) -> Result<Option<TrainerProfile>, ApiError> {
        sqlx::query_as::<_, TrainerProfile>(
            "SELECT id, user_id, bio, specialties FROM trainer_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Load the user for a Google subject, creating it on first sight
    ///
    /// Insert-if-absent is a single `ON CONFLICT DO NOTHING` statement in a
    /// transaction, followed by a read of the winning row. A concurrent
    /// login for the same subject either inserts first (and we read its
    /// row) or waits on our write lock and reads ours. Existing rows are
    /// never modified.
    pub async fn upsert_google_user(&self, identity: &VerifiedIdentity) -> Result<UpsertOutcome, ApiError> {
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            match self.try_upsert(identity).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {
                    warn!(attempt, provider_id = %identity.subject_id, "User id collision, retrying");
                }
                Err(e) if is_retryable(&e) => {
                    warn!(attempt, error = %e, provider_id = %identity.subject_id, "Transient conflict creating user, retrying as lookup");
                }
                Err(e) => {
                    error!(
                        error = %e,
                        provider = "google",
                        provider_id = %identity.subject_id,
                        "Database error during user upsert"
                    );
                    return Err(ApiError::DatabaseError(e));
                }
            }
        }

        Err(ApiError::ServiceUnavailable(
            "Could not create user account, please retry".to_string(),
        ))
    }

    async fn try_upsert(&self, identity: &VerifiedIdentity) -> Result<Option<UpsertOutcome>, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let id = generate_user_id();

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, google_id, email, full_name, picture_url, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(google_id) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&identity.subject_id)
        .bind(&identity.email)
        .bind(&identity.display_name)
        .bind(identity.picture_url.as_deref())
        .bind(UserRole::default())
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE google_id = ?",
            USER_COLUMNS
        ))
        .bind(&identity.subject_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            provider_id = %identity.subject_id,
            inserted,
            found = user.is_some(),
            "User upsert attempt finished"
        );

        Ok(user.map(|user| UpsertOutcome {
            created: inserted && user.id == id,
            user,
        }))
    }
}

/// Unique-key collisions (on the generated id) and lock contention are
/// worth another attempt; anything else is a real failure
fn is_retryable(e: &sqlx::Error) -> bool {
    match e.as_database_error() {
        Some(db) => {
            let msg = db.message();
            msg.contains("UNIQUE constraint failed")
                || msg.contains("database is locked")
                || msg.contains("database table is locked")
        }
        None => false,
    }
}
