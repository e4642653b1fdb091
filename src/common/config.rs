// src/common/config.rs
//! Process configuration, loaded once at start-up from the environment

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET_KEY must be set outside local/dev environments")]
    InsecureSecret,
}

/// Deployment environment, selects which `.env.<name>` file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Dev => "dev",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        }
    }

    pub fn env_file(&self) -> String {
        format!(".env.{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "dev" => Ok(Environment::Dev),
            "stage" => Ok(Environment::Stage),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Application settings shared by every component through `AppState`
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: Environment,
    pub debug: bool,
    pub port: u16,
    pub database_url: String,
    pub reset_db: bool,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    /// Accepted `aud` values for Google ID tokens (web and iOS client ids)
    pub google_audiences: Vec<String>,
    pub google_certs_url: String,
    pub google_certs_refresh: Duration,
    pub google_token_max_age: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_env: Environment::Local,
            debug: false,
            port: 8080,
            database_url: "sqlite://kalba.db".to_string(),
            reset_db: false,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_ttl: Duration::from_secs(60 * 60 * 24 * 7),
            google_audiences: Vec::new(),
            google_certs_url: GOOGLE_CERTS_URL.to_string(),
            google_certs_refresh: Duration::from_secs(3600),
            google_token_max_age: Duration::from_secs(60 * 60 * 24),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Settings {
    /// Load `.env.local`, then `.env.<APP_ENV>`, then `.env`, then read the
    /// process environment.
    ///
    /// Variables already present in the environment are never overridden by
    /// the files. `APP_ENV` is only peeked at here to pick the file; it is
    /// validated in `from_lookup`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::from_filename(".env.local").ok();
        let app_env = env::var("APP_ENV")
            .ok()
            .and_then(|v| v.parse::<Environment>().ok())
            .unwrap_or(Environment::Local);
        if dotenv::from_filename(app_env.env_file()).is_ok() {
            debug!(file = %app_env.env_file(), "Loaded environment file");
        }
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = match get("APP_ENV") {
            Some(v) => v.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "APP_ENV",
                value: v.clone(),
                reason,
            })?,
            None => defaults.app_env,
        };

        let jwt_expire_minutes: u64 = parse_opt("JWT_EXPIRE_MINUTES", get("JWT_EXPIRE_MINUTES"))?
            .unwrap_or(defaults.jwt_ttl.as_secs() / 60);
        if jwt_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRE_MINUTES",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let google_certs_refresh: u64 =
            parse_opt("GOOGLE_CERTS_REFRESH_SECS", get("GOOGLE_CERTS_REFRESH_SECS"))?
                .unwrap_or(defaults.google_certs_refresh.as_secs());
        if google_certs_refresh == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GOOGLE_CERTS_REFRESH_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let jwt_secret = get("JWT_SECRET_KEY").unwrap_or(defaults.jwt_secret);
        if jwt_secret == DEFAULT_JWT_SECRET {
            if matches!(app_env, Environment::Stage | Environment::Prod) {
                return Err(ConfigError::InsecureSecret);
            }
            warn!("JWT_SECRET_KEY not set, using the insecure development default");
        }

        let google_audiences: Vec<String> = ["GOOGLE_CLIENT_ID", "GOOGLE_IOS_CLIENT_ID"]
            .iter()
            .filter_map(|key| get(key))
            .map(|v| v.trim().to_string())
            .collect();

        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            app_env,
            debug: parse_bool("DEBUG", get("DEBUG"))?.unwrap_or(defaults.debug),
            port: parse_opt("PORT", get("PORT"))?.unwrap_or(defaults.port),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            reset_db: parse_bool("RESET_DB", get("RESET_DB"))?.unwrap_or(defaults.reset_db),
            jwt_secret,
            jwt_ttl: Duration::from_secs(jwt_expire_minutes * 60),
            google_audiences,
            google_certs_url: get("GOOGLE_CERTS_URL").unwrap_or(defaults.google_certs_url),
            google_certs_refresh: Duration::from_secs(google_certs_refresh),
            google_token_max_age: parse_opt("GOOGLE_TOKEN_MAX_AGE_SECS", get("GOOGLE_TOKEN_MAX_AGE_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.google_token_max_age),
            cors_origins,
        })
    }
}

fn parse_opt<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            value: v.clone(),
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<Option<bool>, ConfigError> {
    raw.map(|v| match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: v.clone(),
            reason: "expected a boolean".to_string(),
        }),
    })
    .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
