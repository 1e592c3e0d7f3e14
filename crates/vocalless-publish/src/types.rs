//! YouTube Data API v3 wire types.

use serde::{Deserialize, Serialize};

/// Category id for "Music".
pub const MUSIC_CATEGORY_ID: &str = "10";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistInsert {
    pub snippet: PlaylistSnippet,
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlaylistSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Status {
    pub privacy_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_declared_made_for_kids: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoInsert {
    pub snippet: VideoSnippet,
    pub status: Status,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlaylistItemInsert {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemSnippet {
    pub playlist_id: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    pub kind: String,
    pub video_id: String,
}

/// Any insert response; only the id matters.
#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistResource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistResourceSnippet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResourceSnippet {
    pub title: String,
}
