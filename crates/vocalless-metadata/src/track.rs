//! Artist / title extraction from raw media titles.

/// Exact labels removed before splitting.
const LABELS: &[&str] = &[
    " (Official Music Video)",
    " (Official Video)",
    " (Official Audio)",
    " (Lyric Video)",
    " (Lyrics)",
    " (Audio)",
    " (Music Video)",
    " [Official Video]",
    " [Official Music Video]",
    " [Official Audio]",
    " [Lyric Video]",
    " [Music Video]",
    "_instrumental",
    ".mp3",
    ".mp4",
    ".wav",
];

/// Words that mark a bracketed group as a video label.
const LABEL_WORDS: &[&str] = &["official", "lyric", "music", "audio", "video"];

/// Artist and song title parsed from something like
/// `"Artist - Song (Official Music Video)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTitle {
    /// Empty when the raw title has no `" - "` separator
    pub artist: String,
    pub title: String,
}

impl TrackTitle {
    pub fn parse(raw: &str) -> Self {
        let mut clean = raw.to_string();
        for label in LABELS {
            clean = clean.replace(label, "");
        }
        let clean = strip_label_groups(&clean);

        match clean.split_once(" - ") {
            Some((artist, title)) => Self {
                artist: artist.trim().to_string(),
                title: title.trim().to_string(),
            },
            None => Self {
                artist: String::new(),
                title: clean.trim().to_string(),
            },
        }
    }

    /// `"Artist - Title"`, or just the title without an artist.
    pub fn display(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

/// Remove `(...)` / `[...]` groups whose content starts with a label word,
/// together with the whitespace before them.
fn strip_label_groups(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(['(', '[']) {
        let close_char = if rest[open..].starts_with('(') { ')' } else { ']' };
        let Some(close_rel) = rest[open + 1..].find(close_char) else {
            break;
        };
        let close = open + 1 + close_rel;
        let inner = rest[open + 1..close].trim_start().to_lowercase();

        if LABEL_WORDS.iter().any(|w| inner.starts_with(w)) {
            out.push_str(rest[..open].trim_end());
        } else {
            out.push_str(&rest[..=close]);
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}
