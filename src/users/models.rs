//! User data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Role carried on the user row and in session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Trainer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Trainer => "trainer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub google_id: String,
    pub email: String,
    pub full_name: String,
    pub picture_url: Option<String>,
    pub is_active: bool,
    pub role: UserRole,
    pub created_at: String,
}

/// Trainer profile database model, at most one per user
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct TrainerProfile {
    pub id: String,
    pub user_id: String,
    pub bio: String,
    /// Comma-separated
    pub specialties: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TrainerProfileRead {
    pub bio: String,
    pub specialties: Vec<String>,
}

impl From<TrainerProfile> for TrainerProfileRead {
    fn from(profile: TrainerProfile) -> Self {
        Self {
            bio: profile.bio,
            specialties: profile
                .specialties
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// GET /users/me response body
#[derive(Serialize, Deserialize, Debug)]
pub struct UserRead {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub picture_url: Option<String>,
    pub is_active: bool,
    pub role: UserRole,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trainer_profile: Option<TrainerProfileRead>,
}

impl UserRead {
    pub fn new(user: User, trainer_profile: Option<TrainerProfile>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            picture_url: user.picture_url,
            is_active: user.is_active,
            role: user.role,
            created_at: user.created_at,
            trainer_profile: trainer_profile.map(TrainerProfileRead::from),
        }
    }
}

/// Result of the first-login upsert
#[derive(Debug)]
pub struct UpsertOutcome {
    pub user: User,
    /// True when this call inserted the row
    pub created: bool,
}
