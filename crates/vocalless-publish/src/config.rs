//! YouTube client configuration.

use std::time::Duration;

use crate::error::{PublishError, PublishResult};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// YouTube client configuration.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// Data API base URL
    pub api_base: String,
    /// Resumable upload base URL
    pub upload_base: String,
    /// Timeout for metadata requests
    pub timeout: Duration,
    /// Timeout for the upload body
    pub upload_timeout: Duration,
}

impl YouTubeConfig {
    /// Config with the given credentials and public endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(3600),
        }
    }

    /// Point every endpoint at one base URL.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.token_url = format!("{}/token", base);
        self.api_base = format!("{}/youtube/v3", base);
        self.upload_base = format!("{}/upload/youtube/v3", base);
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> PublishResult<Self> {
        let client_id = required("YOUTUBE_CLIENT_ID")?;
        let client_secret = required("YOUTUBE_CLIENT_SECRET")?;
        let refresh_token = required("YOUTUBE_REFRESH_TOKEN")?;

        let mut config = Self::new(client_id, client_secret, refresh_token);
        if let Ok(url) = std::env::var("YOUTUBE_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(url) = std::env::var("YOUTUBE_API_BASE") {
            config.api_base = url;
        }
        if let Ok(url) = std::env::var("YOUTUBE_UPLOAD_BASE") {
            config.upload_base = url;
        }
        config.timeout = Duration::from_secs(
            std::env::var("YOUTUBE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );
        Ok(config)
    }
}

fn required(key: &str) -> PublishResult<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PublishError::missing_credentials(format!("{} must be set", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url() {
        let config = YouTubeConfig::new("id", "secret", "refresh").with_base_url("http://127.0.0.1:9999/");
        assert_eq!(config.token_url, "http://127.0.0.1:9999/token");
        assert_eq!(config.api_base, "http://127.0.0.1:9999/youtube/v3");
        assert_eq!(config.upload_base, "http://127.0.0.1:9999/upload/youtube/v3");
    }

    #[test]
    fn test_defaults_point_at_google() {
        let config = YouTubeConfig::new("id", "secret", "refresh");
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert!(config.api_base.starts_with("https://www.googleapis.com"));
    }
}
