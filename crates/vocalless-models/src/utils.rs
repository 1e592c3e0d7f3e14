//! URL helpers shared by the API surface and the worker.

use url::Url;

const YOUTUBE_ID_LEN: usize = 11;

/// Extract an 11-character YouTube video ID from a URL.
///
/// Handles `watch?v=`, `youtu.be/`, `/embed/`, `/v/` and `/shorts/` forms.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    let candidate = if host == "youtu.be" || host.ends_with(".youtu.be") {
        parsed.path_segments()?.next().map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        let mut segments = parsed.path_segments()?;
        match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("embed") | Some("v") | Some("shorts") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_valid_youtube_id(id))
}

fn is_valid_youtube_id(id: &str) -> bool {
    id.len() == YOUTUBE_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Trim a source URL and strip playlist context from single-video links.
///
/// A watch URL carrying `list=` is rewritten to the canonical
/// `https://www.youtube.com/watch?v=<id>` so only that video is processed.
/// Everything else passes through trimmed.
pub fn normalize_source_url(url: &str) -> String {
    let trimmed = url.trim();

    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    let carries_list = parsed.query_pairs().any(|(k, _)| k == "list");
    let is_watch = parsed.path() == "/watch";

    if carries_list && is_watch {
        if let Some(id) = extract_youtube_id(trimmed) {
            return format!("https://www.youtube.com/watch?v={}", id);
        }
    }

    trimmed.to_string()
}
