// src/workshops/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Workshop database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Workshop {
    pub id: String,
    pub trainer_id: String,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub duration_minutes: i64,
    /// Decimal with two fractional digits, e.g. "15.00"
    pub price: String,
    pub max_participants: i64,
    pub created_at: String,
}

/// Price as sent by clients: either `"12.50"` or `12.5`
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

/// POST /workshops/ request body
#[derive(Deserialize, Debug, Clone)]
pub struct CreateWorkshop {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// RFC 3339; a timestamp without offset is taken as UTC
    pub start_time: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: Option<PriceInput>,
    pub max_participants: i64,
}

/// A validated, normalized workshop ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkshop {
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub price: String,
    pub max_participants: i64,
}
