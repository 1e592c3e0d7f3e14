//! YouTube Data API v3 client.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};
use vocalless_models::{CollectionSummary, Privacy, PublishMetadata};

use crate::config::YouTubeConfig;
use crate::error::{PublishError, PublishResult};
use crate::token_cache::{OAuthRefreshSource, TokenCache};
use crate::traits::{Publisher, PublisherFactory};
use crate::types::{
    Created, PlaylistInsert, PlaylistItemInsert, PlaylistItemSnippet, PlaylistListResponse,
    PlaylistSnippet, ResourceId, Status, VideoInsert, VideoSnippet, MUSIC_CATEGORY_ID,
};

const PAGE_SIZE: &str = "50";

/// YouTube Data API client authenticated with a refresh token.
pub struct YouTubeClient {
    http: Client,
    config: YouTubeConfig,
    token_cache: Arc<TokenCache>,
}

impl YouTubeClient {
    pub fn new(config: YouTubeConfig) -> PublishResult<Self> {
        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("vocalless-publish/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let source = OAuthRefreshSource::new(
            http.clone(),
            &config.token_url,
            &config.client_id,
            &config.client_secret,
            &config.refresh_token,
        );

        Ok(Self {
            http,
            config,
            token_cache: Arc::new(TokenCache::new(Arc::new(source))),
        })
    }

    /// Obtain an access token, proving the credentials work.
    pub async fn authorize(&self) -> PublishResult<()> {
        self.token_cache.get_token().await.map(|_| ())
    }

    async fn authed(&self, request: RequestBuilder) -> PublishResult<RequestBuilder> {
        let token = self.token_cache.get_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Fail on non-success statuses, dropping the cached token on 401.
    async fn check(&self, response: Response) -> PublishResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 {
            self.token_cache.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Publisher for YouTubeClient {
    async fn list_collections(&self) -> PublishResult<Vec<CollectionSummary>> {
        let url = format!("{}/playlists", self.config.api_base);
        let mut collections = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("mine", "true".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let request = self
                .authed(self.http.get(&url).query(&query).timeout(self.config.timeout))
                .await?;
            let response = self.check(request.send().await?).await?;
            let page: PlaylistListResponse = response.json().await?;

            collections.extend(page.items.into_iter().map(|p| CollectionSummary {
                id: p.id,
                title: p.snippet.title,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = collections.len(), "Listed playlists");
        Ok(collections)
    }

    async fn create_collection(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> PublishResult<String> {
        let body = PlaylistInsert {
            snippet: PlaylistSnippet {
                title: title.to_string(),
                description: description.to_string(),
            },
            status: Status {
                privacy_status: privacy.as_str().to_string(),
                self_declared_made_for_kids: None,
            },
        };

        let request = self
            .authed(
                self.http
                    .post(format!("{}/playlists", self.config.api_base))
                    .query(&[("part", "snippet,status")])
                    .json(&body)
                    .timeout(self.config.timeout),
            )
            .await?;
        let created: Created = self.check(request.send().await?).await?.json().await?;

        info!(playlist_id = %created.id, title = %title, "Created playlist");
        Ok(created.id)
    }

    async fn upload_video(
        &self,
        video: &Path,
        metadata: &PublishMetadata,
        privacy: Privacy,
    ) -> PublishResult<String> {
        let bytes = tokio::fs::read(video).await?;

        let body = VideoInsert {
            snippet: VideoSnippet {
                title: metadata.title.clone(),
                description: metadata.description.clone(),
                tags: metadata.tags.clone(),
                category_id: MUSIC_CATEGORY_ID.to_string(),
            },
            status: Status {
                privacy_status: privacy.as_str().to_string(),
                self_declared_made_for_kids: Some(false),
            },
        };

        let request = self
            .authed(
                self.http
                    .post(format!("{}/videos", self.config.upload_base))
                    .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
                    .header("X-Upload-Content-Type", "video/mp4")
                    .header("X-Upload-Content-Length", bytes.len().to_string())
                    .json(&body)
                    .timeout(self.config.timeout),
            )
            .await?;
        let session = self.check(request.send().await?).await?;

        let session_url = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PublishError::invalid_response("Upload session has no Location header"))?;

        debug!(size = bytes.len(), "Uploading {}", video.display());
        let request = self
            .authed(
                self.http
                    .put(&session_url)
                    .header(reqwest::header::CONTENT_TYPE, "video/mp4")
                    .body(bytes)
                    .timeout(self.config.upload_timeout),
            )
            .await?;
        let created: Created = self.check(request.send().await?).await?.json().await?;

        info!(video_id = %created.id, "Uploaded video");
        Ok(created.id)
    }

    async fn add_to_collection(&self, collection_id: &str, video_id: &str) -> PublishResult<()> {
        let body = PlaylistItemInsert {
            snippet: PlaylistItemSnippet {
                playlist_id: collection_id.to_string(),
                resource_id: ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: video_id.to_string(),
                },
            },
        };

        let request = self
            .authed(
                self.http
                    .post(format!("{}/playlistItems", self.config.api_base))
                    .query(&[("part", "snippet")])
                    .json(&body)
                    .timeout(self.config.timeout),
            )
            .await?;
        self.check(request.send().await?).await?;

        debug!(playlist_id = %collection_id, video_id = %video_id, "Added video to playlist");
        Ok(())
    }

    fn collection_url(&self, collection_id: &str) -> String {
        playlist_url(collection_id)
    }

    fn video_url(&self, video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

/// Public link of a playlist.
pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}

/// Builds a [`YouTubeClient`] from the environment and verifies the
/// credentials by fetching a token up front.
#[derive(Debug, Clone, Default)]
pub struct YouTubeConnector {
    config: Option<YouTubeConfig>,
}

impl YouTubeConnector {
    /// Read `YOUTUBE_*` variables on every connect.
    pub fn from_env() -> Self {
        Self { config: None }
    }

    /// Use a fixed configuration.
    pub fn with_config(config: YouTubeConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

#[async_trait]
impl PublisherFactory for YouTubeConnector {
    async fn connect(&self) -> PublishResult<Arc<dyn Publisher>> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => YouTubeConfig::from_env()?,
        };
        let client = YouTubeClient::new(config)?;
        client.authorize().await?;
        Ok(Arc::new(client))
    }

    fn collection_url(&self, collection_id: &str) -> String {
        playlist_url(collection_id)
    }
}
