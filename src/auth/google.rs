//! Google ID token verification against Google's published signing keys
//!
//! Keys are cached process-wide by key id. The cache refreshes on a timer
//! and, rate-limited, when a token names a key id it has not seen yet.
//! Verification never fetches keys per request in the steady state.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::models::{GoogleIdTokenClaims, VerifiedIdentity};
use crate::common::config::Settings;
use crate::common::ApiError;

/// Both issuer spellings Google uses in ID tokens
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Clock skew tolerated on `exp`, `nbf` and `iat`
const CLOCK_LEEWAY_SECS: u64 = 60;

/// Unknown key ids trigger at most one refresh per this interval
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid Google ID token: {0}")]
    Invalid(String),

    #[error("Google signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid(_) => ApiError::Unauthorized("Invalid Google ID token".to_string()),
            TokenError::KeysUnavailable(_) => ApiError::ServiceUnavailable(
                "Google token validation service unavailable".to_string(),
            ),
        }
    }
}

/// One RSA key from Google's JWKS document
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleJwk {
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleJwks {
    pub keys: Vec<GoogleJwk>,
}

/// Where signing keys come from
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch_keys(&self) -> Result<Vec<GoogleJwk>, TokenError>;
}

/// Fetches the JWKS document over HTTPS
pub struct HttpKeySource {
    http: Client,
    url: String,
}

impl HttpKeySource {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_keys(&self) -> Result<Vec<GoogleJwk>, TokenError> {
        debug!(url = %self.url, "Fetching Google signing keys");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TokenError::KeysUnavailable(e.to_string()))?;

        let jwks = response
            .json::<GoogleJwks>()
            .await
            .map_err(|e| TokenError::KeysUnavailable(format!("malformed JWKS: {}", e)))?;

        Ok(jwks.keys)
    }
}

#[derive(Default)]
struct CachedKeys {
    by_kid: HashMap<String, GoogleJwk>,
    fetched_at: Option<Instant>,
}

/// Process-wide cache of Google signing keys keyed by `kid`
pub struct GoogleKeyCache {
    source: Arc<dyn KeySource>,
    keys: RwLock<CachedKeys>,
    refresh_lock: Mutex<()>,
    refresh_interval: Duration,
    min_refresh_interval: Duration,
}

impl GoogleKeyCache {
    pub fn new(source: Arc<dyn KeySource>, refresh_interval: Duration) -> Self {
        Self {
            source,
            keys: RwLock::new(CachedKeys::default()),
            refresh_lock: Mutex::new(()),
            refresh_interval,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL.min(refresh_interval),
        }
    }

    #[cfg(test)]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Replace the cached keys with a fresh copy from the source
    pub async fn refresh(&self) -> Result<usize, TokenError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<usize, TokenError> {
        let fetched = self.source.fetch_keys().await?;
        let by_kid: HashMap<String, GoogleJwk> = fetched
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();
        let count = by_kid.len();

        let mut cache = self.keys.write().await;
        cache.by_kid = by_kid;
        cache.fetched_at = Some(Instant::now());

        info!(keys = count, "Google signing keys refreshed");
        Ok(count)
    }

    async fn lookup(&self, kid: &str) -> (Option<GoogleJwk>, Option<Instant>) {
        let cache = self.keys.read().await;
        (cache.by_kid.get(kid).cloned(), cache.fetched_at)
    }

    fn is_stale(&self, fetched_at: Option<Instant>) -> bool {
        fetched_at.map_or(true, |t| t.elapsed() >= self.refresh_interval)
    }

    /// Key for `kid`, refreshing first when the cache is stale or the key is
    /// unknown and the last fetch is older than the minimum refresh interval
    pub async fn key_for(&self, kid: &str) -> Result<GoogleJwk, TokenError> {
        let (found, fetched_at) = self.lookup(kid).await;
        if let Some(key) = &found {
            if !self.is_stale(fetched_at) {
                return Ok(key.clone());
            }
        }

        // Serialize refreshes: a burst of misses produces one fetch
        let _guard = self.refresh_lock.lock().await;
        let (found, fetched_at) = self.lookup(kid).await;

        let miss_may_refresh =
            found.is_none() && fetched_at.map_or(true, |t| t.elapsed() >= self.min_refresh_interval);

        if self.is_stale(fetched_at) || miss_may_refresh {
            if let Err(e) = self.refresh_locked().await {
                return match found {
                    Some(key) => {
                        warn!(error = %e, kid = %kid, "Key refresh failed, using cached key");
                        Ok(key)
                    }
                    None => Err(e),
                };
            }
            let (found, _) = self.lookup(kid).await;
            return found.ok_or_else(|| TokenError::Invalid(format!("unknown key id '{}'", kid)));
        }

        found.ok_or_else(|| TokenError::Invalid(format!("unknown key id '{}'", kid)))
    }

    /// Refresh on a fixed period in the background
    pub fn spawn_refresh_task(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.refresh_interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "Failed to refresh Google signing keys");
                }
            }
        })
    }
}

/// Verifies Google ID tokens for the configured client ids
pub struct GoogleTokenVerifier {
    keys: Arc<GoogleKeyCache>,
    audiences: Vec<String>,
    max_token_age: Duration,
}

impl GoogleTokenVerifier {
    pub fn new(keys: Arc<GoogleKeyCache>, settings: &Settings) -> Self {
        Self {
            keys,
            audiences: settings.google_audiences.clone(),
            max_token_age: settings.google_token_max_age,
        }
    }

    pub async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, TokenError> {
        if self.audiences.is_empty() {
            warn!("No Google client ids configured, rejecting ID token");
            return Err(TokenError::Invalid("no accepted audiences configured".to_string()));
        }

        let header = decode_header(id_token)
            .map_err(|e| TokenError::Invalid(format!("malformed header: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("missing key id".to_string()))?;

        let jwk = self.keys.key_for(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| TokenError::Invalid(format!("unusable key '{}': {}", kid, e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(self.audiences.as_slice());
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_LEEWAY_SECS;

        let claims = decode::<GoogleIdTokenClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "expired".to_string(),
                    ErrorKind::ImmatureSignature => "not yet valid".to_string(),
                    ErrorKind::InvalidAudience => "audience mismatch".to_string(),
                    ErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
                    ErrorKind::InvalidSignature => "bad signature".to_string(),
                    _ => e.to_string(),
                };
                TokenError::Invalid(reason)
            })?
            .claims;

        self.check_issued_at(claims.iat)?;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("empty subject".to_string()));
        }

        Ok(VerifiedIdentity {
            subject_id: claims.sub,
            email: claims.email.unwrap_or_default(),
            display_name: claims.name.unwrap_or_default(),
            picture_url: claims.picture,
            audience: claims.aud,
        })
    }

    fn check_issued_at(&self, iat: Option<i64>) -> Result<(), TokenError> {
        let iat = iat.ok_or_else(|| TokenError::Invalid("missing iat".to_string()))?;
        let now = Utc::now().timestamp();

        if iat > now + CLOCK_LEEWAY_SECS as i64 {
            return Err(TokenError::Invalid("issued in the future".to_string()));
        }
        if now - iat > self.max_token_age.as_secs() as i64 {
            return Err(TokenError::Invalid("issued too long ago".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{
        test_keys, test_settings, GoogleTokenBuilder, StaticKeySource, TEST_AUDIENCE, TEST_KID,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn verifier_with(settings: &Settings) -> GoogleTokenVerifier {
        let cache = GoogleKeyCache::new(Arc::new(StaticKeySource::new(test_keys())), Duration::from_secs(3600));
        GoogleTokenVerifier::new(Arc::new(cache), settings)
    }

    fn verifier() -> GoogleTokenVerifier {
        verifier_with(&test_settings())
    }

    /// Serves a different key set on each fetch, counting fetches
    struct RotatingKeySource {
        batches: Vec<Vec<GoogleJwk>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySource for RotatingKeySource {
        async fn fetch_keys(&self) -> Result<Vec<GoogleJwk>, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.batches[n.min(self.batches.len() - 1)].clone())
        }
    }

    struct FailingKeySource;

    #[async_trait]
    impl KeySource for FailingKeySource {
        async fn fetch_keys(&self) -> Result<Vec<GoogleJwk>, TokenError> {
            Err(TokenError::KeysUnavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let token = GoogleTokenBuilder::new("google-sub-1").sign();
        let identity = verifier().verify(&token).await.expect("token should verify");

        assert_eq!(identity.subject_id, "google-sub-1");
        assert_eq!(identity.email, "google-sub-1@example.com");
        assert_eq!(identity.display_name, "Test User");
        assert_eq!(identity.audience, TEST_AUDIENCE);
    }

    #[tokio::test]
    async fn test_second_configured_audience_is_accepted() {
        let mut settings = test_settings();
        settings.google_audiences.push("ios-client.apps.googleusercontent.com".to_string());

        let token = GoogleTokenBuilder::new("sub")
            .audience("ios-client.apps.googleusercontent.com")
            .sign();
        let identity = verifier_with(&settings).verify(&token).await.unwrap();
        assert_eq!(identity.audience, "ios-client.apps.googleusercontent.com");
    }

    #[tokio::test]
    async fn test_short_issuer_form_is_accepted() {
        let token = GoogleTokenBuilder::new("sub").issuer("accounts.google.com").sign();
        assert!(verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let token = GoogleTokenBuilder::new("sub").audience("someone-else").sign();
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, TokenError::Invalid(ref r) if r == "audience mismatch"), "{:?}", err);
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let token = GoogleTokenBuilder::new("sub").issuer("https://evil.example.com").sign();
        assert!(matches!(verifier().verify(&token).await, Err(TokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = GoogleTokenBuilder::new("sub")
            .issued_at(now - 7200)
            .expires_at(now - 3600)
            .sign();
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, TokenError::Invalid(ref r) if r == "expired"), "{:?}", err);
    }

    #[tokio::test]
    async fn test_not_yet_valid_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = GoogleTokenBuilder::new("sub").not_before(now + 3600).sign();
        assert!(matches!(verifier().verify(&token).await, Err(TokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_stale_issue_time_is_rejected() {
        let mut settings = test_settings();
        settings.google_token_max_age = Duration::from_secs(600);
        let now = Utc::now().timestamp();

        let token = GoogleTokenBuilder::new("sub").issued_at(now - 1200).sign();
        let err = verifier_with(&settings).verify(&token).await.unwrap_err();
        assert!(matches!(err, TokenError::Invalid(ref r) if r == "issued too long ago"), "{:?}", err);
    }

    #[tokio::test]
    async fn test_missing_issue_time_is_rejected() {
        let token = GoogleTokenBuilder::new("sub").without_issued_at().sign();
        assert!(matches!(verifier().verify(&token).await, Err(TokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_tampered_signature_is_rejected() {
        let token = GoogleTokenBuilder::new("sub").sign();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        // Swap the payload for one claiming a different subject
        let forged = GoogleTokenBuilder::new("attacker").sign();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        let err = verifier().verify(&tampered).await.unwrap_err();
        assert!(matches!(err, TokenError::Invalid(ref r) if r == "bad signature"), "{:?}", err);
    }

    #[tokio::test]
    async fn test_token_signed_by_unknown_key_is_rejected() {
        let token = GoogleTokenBuilder::new("sub").signed_by_rogue_key().sign();
        assert!(matches!(verifier().verify(&token).await, Err(TokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected() {
        for garbage in ["", "not-a-jwt", "a.b.c"] {
            assert!(matches!(verifier().verify(garbage).await, Err(TokenError::Invalid(_))));
        }
    }

    #[tokio::test]
    async fn test_no_configured_audience_rejects_everything() {
        let mut settings = test_settings();
        settings.google_audiences.clear();
        let token = GoogleTokenBuilder::new("sub").sign();
        assert!(matches!(
            verifier_with(&settings).verify(&token).await,
            Err(TokenError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_key_cache_fetches_once_for_repeated_lookups() {
        let source = Arc::new(RotatingKeySource {
            batches: vec![test_keys()],
            calls: AtomicUsize::new(0),
        });
        let cache = GoogleKeyCache::new(source.clone(), Duration::from_secs(3600));

        for _ in 0..5 {
            cache.key_for(TEST_KID).await.unwrap();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_cache_refreshes_on_rotated_kid() {
        let mut rotated = test_keys();
        rotated[0].kid = "rotated-key".to_string();
        let source = Arc::new(RotatingKeySource {
            batches: vec![test_keys(), rotated],
            calls: AtomicUsize::new(0),
        });
        let cache = GoogleKeyCache::new(source.clone(), Duration::from_secs(3600))
            .with_min_refresh_interval(Duration::ZERO);

        cache.key_for(TEST_KID).await.unwrap();
        let key = cache.key_for("rotated-key").await.expect("miss should trigger refresh");
        assert_eq!(key.kid, "rotated-key");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_key_cache_rate_limits_refresh_on_unknown_kid() {
        let source = Arc::new(RotatingKeySource {
            batches: vec![test_keys()],
            calls: AtomicUsize::new(0),
        });
        let cache = GoogleKeyCache::new(source.clone(), Duration::from_secs(3600));
        cache.refresh().await.unwrap();

        for _ in 0..3 {
            assert!(matches!(cache.key_for("nope").await, Err(TokenError::Invalid(_))));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_key_endpoint_is_service_unavailable() {
        let cache = GoogleKeyCache::new(Arc::new(FailingKeySource), Duration::from_secs(3600));
        let verifier = GoogleTokenVerifier::new(Arc::new(cache), &test_settings());

        let token = GoogleTokenBuilder::new("sub").sign();
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, TokenError::KeysUnavailable(_)));

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
