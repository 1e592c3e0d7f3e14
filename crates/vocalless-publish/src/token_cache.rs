//! OAuth access-token caching.
//!
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight refresh under a write lock
//! - Fallback to the existing token while it is still usable

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{PublishError, PublishResult};

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL used when the token endpoint omits `expires_in`.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Duration,
}

/// Issues access tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> PublishResult<AccessToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges a long-lived refresh token for access tokens.
pub struct OAuthRefreshSource {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl OAuthRefreshSource {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for OAuthRefreshSource {
    async fn fetch(&self) -> PublishResult<AccessToken> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| PublishError::auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::auth(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PublishError::auth(format!("Malformed token response: {}", e)))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_in: token
                .expires_in
                .map(Duration::from_secs)
                .unwrap_or(TOKEN_DEFAULT_TTL),
        })
    }
}

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Valid with refresh margin.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Technically still usable, even if a refresh is due.
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    /// Invalidate the cached token.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> PublishResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited.
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        match self.source.fetch().await {
            Ok(token) => {
                *cache = Some(CachedToken {
                    access_token: token.token.clone(),
                    expires_at: Instant::now() + token.expires_in,
                });
                debug!(expires_in_secs = token.expires_in.as_secs(), "Refreshed access token");
                Ok(token.token)
            }
            Err(e) => {
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        calls: AtomicUsize,
        responses: Mutex<Vec<PublishResult<AccessToken>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<PublishResult<AccessToken>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl TokenSource for ScriptedSource {
        async fn fetch(&self) -> PublishResult<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn token(value: &str, secs: u64) -> PublishResult<AccessToken> {
        Ok(AccessToken {
            token: value.to_string(),
            expires_in: Duration::from_secs(secs),
        })
    }

    #[tokio::test]
    async fn test_caches_valid_token() {
        let source = ScriptedSource::new(vec![token("a", 3600)]);
        let cache = TokenCache::new(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "a");
        assert_eq!(cache.get_token().await.unwrap(), "a");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshes_inside_margin() {
        let source = ScriptedSource::new(vec![token("a", 30), token("b", 3600)]);
        let cache = TokenCache::new(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "a");
        assert_eq!(cache.get_token().await.unwrap(), "b");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_usable_token() {
        let source = ScriptedSource::new(vec![
            token("a", 30),
            Err(PublishError::auth("endpoint down")),
        ]);
        let cache = TokenCache::new(source);

        assert_eq!(cache.get_token().await.unwrap(), "a");
        assert_eq!(cache.get_token().await.unwrap(), "a");
    }

    #[tokio::test]
    async fn test_error_without_token() {
        let source = ScriptedSource::new(vec![Err(PublishError::auth("bad refresh token"))]);
        let cache = TokenCache::new(source);

        let err = cache.get_token().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let source = ScriptedSource::new(vec![token("a", 3600), token("b", 3600)]);
        let cache = TokenCache::new(source.clone());

        cache.get_token().await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.get_token().await.unwrap(), "b");
    }
}
