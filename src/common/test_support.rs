//! Shared fixtures for unit tests: an in-memory app, a fixed Google signing
//! key and helpers to mint ID tokens with it

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::config::Settings;
use super::db::connect_in_memory;
use super::migrations::run_migrations;
use super::state::AppState;
use crate::auth::google::{GoogleJwk, GoogleJwks, KeySource, TokenError};
use crate::auth::{GoogleKeyCache, GoogleTokenVerifier, SessionKeys};
use crate::common::{generate_user_id, now_timestamp};
use crate::users::models::{User, UserRole};

pub const TEST_AUDIENCE: &str = "web-client.apps.googleusercontent.com";
pub const TEST_SECRET: &str = "test_secret_key";
pub const TEST_KID: &str = "test-key-1";

const SIGNING_KEY_PEM: &[u8] = include_bytes!("../auth/testdata/google_signing_key.pem");
const ROGUE_KEY_PEM: &[u8] = include_bytes!("../auth/testdata/rogue_signing_key.pem");
const CERTS_JSON: &str = include_str!("../auth/testdata/google_certs.json");

/// Public half of the test signing key, as Google would publish it
pub fn test_keys() -> Vec<GoogleJwk> {
    serde_json::from_str::<GoogleJwks>(CERTS_JSON)
        .expect("test certs fixture is valid JSON")
        .keys
}

pub struct StaticKeySource {
    keys: Vec<GoogleJwk>,
}

impl StaticKeySource {
    pub fn new(keys: Vec<GoogleJwk>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch_keys(&self) -> Result<Vec<GoogleJwk>, TokenError> {
        Ok(self.keys.clone())
    }
}

pub fn test_settings() -> Settings {
    Settings {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_ttl: Duration::from_secs(3600),
        google_audiences: vec![TEST_AUDIENCE.to_string()],
        ..Settings::default()
    }
}

pub async fn test_state_with(settings: Settings) -> Arc<AppState> {
    let db = connect_in_memory().await.expect("in-memory sqlite");
    run_migrations(&db, false).await.expect("migrations");

    let cache = GoogleKeyCache::new(
        Arc::new(StaticKeySource::new(test_keys())),
        settings.google_certs_refresh,
    );
    let google = GoogleTokenVerifier::new(Arc::new(cache), &settings);
    let sessions = SessionKeys::from_settings(&settings);

    Arc::new(AppState {
        db,
        settings: Arc::new(settings),
        google: Arc::new(google),
        sessions: Arc::new(sessions),
    })
}

pub async fn test_state() -> Arc<AppState> {
    test_state_with(test_settings()).await
}

pub async fn user_count(db: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .expect("count users")
}

/// Insert a user directly, bypassing the login flow
pub async fn insert_user(db: &SqlitePool, google_id: &str, role: UserRole) -> User {
    let id = generate_user_id();
    sqlx::query(
        "INSERT INTO users (id, google_id, email, full_name, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(google_id)
    .bind(format!("{}@example.com", google_id))
    .bind("Seeded User")
    .bind(role)
    .bind(now_timestamp())
    .execute(db)
    .await
    .expect("insert user");

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(db)
        .await
        .expect("fetch inserted user")
}

pub async fn set_role(db: &SqlitePool, user_id: &str, role: UserRole) {
    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(user_id)
        .execute(db)
        .await
        .expect("update role");
}

/// Builds Google-style ID tokens signed with the test key
pub struct GoogleTokenBuilder {
    sub: String,
    aud: String,
    iss: String,
    iat: Option<i64>,
    exp: i64,
    nbf: Option<i64>,
    rogue: bool,
}

impl GoogleTokenBuilder {
    pub fn new(sub: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: sub.to_string(),
            aud: TEST_AUDIENCE.to_string(),
            iss: "https://accounts.google.com".to_string(),
            iat: Some(now),
            exp: now + 3600,
            nbf: None,
            rogue: false,
        }
    }

    pub fn audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    pub fn issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    pub fn without_issued_at(mut self) -> Self {
        self.iat = None;
        self
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    pub fn not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Sign with a key Google never published, under the published kid
    pub fn signed_by_rogue_key(mut self) -> Self {
        self.rogue = true;
        self
    }

    pub fn sign(self) -> String {
        let mut claims = json!({
            "sub": self.sub,
            "aud": self.aud,
            "iss": self.iss,
            "exp": self.exp,
            "email": format!("{}@example.com", self.sub),
            "email_verified": true,
            "name": "Test User",
            "picture": "https://lh3.googleusercontent.com/a/test",
        });
        if let Some(iat) = self.iat {
            claims["iat"] = json!(iat);
        }
        if let Some(nbf) = self.nbf {
            claims["nbf"] = json!(nbf);
        }

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(TEST_KID.to_string());

        let pem = if self.rogue { ROGUE_KEY_PEM } else { SIGNING_KEY_PEM };
        let key = EncodingKey::from_rsa_pem(pem).expect("test RSA key");
        encode(&header, &claims, &key).expect("sign test token")
    }
}
