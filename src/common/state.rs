// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::Settings;
use crate::auth::{GoogleTokenVerifier, SessionKeys};

/// Database pool, configuration and the two token authorities.
/// Built once in `main` and handed to handlers as `Extension<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub settings: Arc<Settings>,
    pub google: Arc<GoogleTokenVerifier>,
    pub sessions: Arc<SessionKeys>,
}
