//! Metadata generation with baked-in fallbacks.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use vocalless_models::PublishMetadata;

use crate::error::MetadataResult;
use crate::track::TrackTitle;

pub const DEFAULT_COLLECTION_DESCRIPTION: &str =
    "Instrumental remasters created with AI vocal separation";

const MAX_TITLE_CHARS: usize = 100;
const MAX_TAGS: usize = 15;
const MAX_TAG_CHARS_TOTAL: usize = 500;

const BASE_TAGS: &[&str] = &[
    "instrumental",
    "karaoke",
    "no vocals",
    "background music",
    "instrumental version",
    "music without vocals",
    "instrumental track",
    "backing track",
];

const TITLE_SYSTEM: &str = "You are a YouTube content specialist who creates engaging, natural video titles. \
Titles must be SEO-friendly but not keyword-stuffed, include \"Instrumental Remaster\", stay under 100 characters, \
follow the format: Artist - Title (Instrumental Remaster), and never include descriptors like \"Official Video\".";

const DESCRIPTION_SYSTEM: &str = "You are a YouTube content writer who creates direct, practical video descriptions. \
Write exactly 2 short paragraphs, factual and professional, with keywords used naturally. \
No promotional, poetic or flowery language.";

const TAGS_SYSTEM: &str = "You are a YouTube SEO specialist. Produce 10-15 relevant tags mixing specific and general \
terms, including the artist name, song title and \"instrumental\". Output a comma-separated list only.";

const COLLECTION_SYSTEM: &str = "You write short, factual YouTube playlist descriptions. \
Two sentences at most, no hashtags, no emojis.";

/// Free-form text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> MetadataResult<String>;
}

/// Produces publish metadata; falls back to canned text on any failure.
#[derive(Clone, Default)]
pub struct MetadataGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl MetadataGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Fallback-only generator.
    pub fn canned() -> Self {
        Self { generator: None }
    }

    async fn ask(&self, what: &str, system: &str, prompt: &str) -> Option<String> {
        let generator = self.generator.as_ref()?;
        match generator.generate(system, prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                debug!("Empty {} from text generator, using fallback", what);
                None
            }
            Err(e) => {
                warn!("Failed to generate {}, using fallback: {}", what, e);
                None
            }
        }
    }

    /// Description for a new collection.
    pub async fn collection_description(&self, name: &str) -> String {
        let prompt = format!(
            "Write a description for a YouTube playlist named \"{}\" that collects instrumental \
             remasters of songs made with AI vocal separation and audio mastering. \
             Write ONLY the description.",
            name
        );
        self.ask("collection description", COLLECTION_SYSTEM, &prompt)
            .await
            .unwrap_or_else(|| DEFAULT_COLLECTION_DESCRIPTION.to_string())
    }

    /// Title, description and tags for a rendered item.
    pub async fn video_metadata(&self, raw_title: &str) -> PublishMetadata {
        let track = TrackTitle::parse(raw_title);
        debug!(artist = %track.artist, title = %track.title, "Generating metadata");

        let title = self.title(&track).await;
        let description = self.description(&track).await;
        let tags = self.tags(&track).await;

        PublishMetadata {
            title,
            description,
            tags,
        }
    }

    async fn title(&self, track: &TrackTitle) -> String {
        let prompt = format!(
            "Create a YouTube video title for an instrumental remaster version of a song.\n\
             Artist: {}\nSong Title: {}\n\
             Generate ONLY the title, nothing else.",
            track.artist, track.title
        );
        let title = self
            .ask("title", TITLE_SYSTEM, &prompt)
            .await
            .map(|t| t.trim_matches(|c| c == '"' || c == '\'').trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title(track));
        truncate_chars(&title, MAX_TITLE_CHARS)
    }

    async fn description(&self, track: &TrackTitle) -> String {
        let prompt = format!(
            "Write a direct, practical YouTube video description for an instrumental remaster of a song.\n\
             Artist: {}\nSong Title: {}\n\
             Paragraph 1: state that this is an instrumental remaster with AI-powered audio enhancement.\n\
             Paragraph 2: list practical uses such as background music for work or study, or karaoke practice.\n\
             Write ONLY the description.",
            track.artist, track.title
        );
        self.ask("description", DESCRIPTION_SYSTEM, &prompt)
            .await
            .unwrap_or_else(|| fallback_description(track))
    }

    async fn tags(&self, track: &TrackTitle) -> Vec<String> {
        let prompt = format!(
            "Generate YouTube tags for an instrumental version of a song.\n\
             Artist: {}\nSong Title: {}\n\
             Output ONLY a comma-separated list.",
            track.artist, track.title
        );
        let generated = self
            .ask("tags", TAGS_SYSTEM, &prompt)
            .await
            .map(|text| finalize_tags(text.split(',').map(str::to_string)))
            .unwrap_or_default();

        if generated.is_empty() {
            finalize_tags(fallback_tags(track))
        } else {
            generated
        }
    }
}

fn fallback_title(track: &TrackTitle) -> String {
    format!("{} (Instrumental Remaster)", track.display())
}

fn fallback_description(track: &TrackTitle) -> String {
    let subject = if track.artist.is_empty() {
        format!("\"{}\"", track.title)
    } else {
        format!("\"{}\" by {}", track.title, track.artist)
    };
    format!(
        "Instrumental remaster of {}.\n\n\
         This high-quality instrumental remaster removes the vocals while preserving the original music \
         with AI-powered audio enhancement, making it perfect for karaoke, music production, or simply \
         enjoying the instrumental arrangement.\n\n\
         Perfect as background music for studying, working, or creative projects.",
        subject
    )
}

fn fallback_tags(track: &TrackTitle) -> Vec<String> {
    let mut tags = Vec::new();
    if !track.artist.is_empty() {
        tags.push(track.artist.clone());
        tags.push(format!("{} instrumental", track.artist));
    }
    if !track.title.is_empty() {
        tags.push(track.title.clone());
        tags.push(format!("{} instrumental", track.title));
    }
    tags.extend(BASE_TAGS.iter().map(|t| t.to_string()));
    tags
}

/// Keep alphanumerics, spaces and hyphens; drop empties and duplicates;
/// cap count and total length.
fn finalize_tags(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut total = 0;
    let mut tags = Vec::new();

    for tag in raw {
        let cleaned: String = tag
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() || !seen.insert(cleaned.to_lowercase()) {
            continue;
        }

        let len = cleaned.chars().count();
        if tags.len() == MAX_TAGS || total + len > MAX_TAG_CHARS_TOTAL {
            break;
        }
        total += len;
        tags.push(cleaned);
    }

    tags
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
