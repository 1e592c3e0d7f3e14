//! Conventional artifact naming on disk.
//!
//! Every artifact of an item derives from its title, so cleanup can find
//! the siblings of a rendered video without any extra bookkeeping:
//!
//! ```text
//! output/
//!   temp/                      downloads and separation scratch space
//!   instrumentals/<stem>.mp3
//!   acapellas/<stem>.mp3
//!   videos/<stem>_video.mp4
//!   videos/<stem>_metadata.json
//! ```

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;
use crate::fs_utils::remove_if_exists;

const VIDEO_SUFFIX: &str = "_video";

/// Filesystem-safe stem for a title.
///
/// Keeps alphanumerics and ` -_(),.'&`; `/` becomes `-`; everything else
/// is dropped.
pub fn safe_stem(title: &str) -> String {
    title
        .chars()
        .filter_map(|c| match c {
            '/' => Some('-'),
            c if c.is_alphanumeric() => Some(c),
            ' ' | '-' | '_' | '(' | ')' | ',' | '.' | '\'' | '&' => Some(c),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Directory layout rooted at the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn instrumentals_dir(&self) -> PathBuf {
        self.root.join("instrumentals")
    }

    pub fn acapellas_dir(&self) -> PathBuf {
        self.root.join("acapellas")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Create all directories.
    pub async fn ensure_dirs(&self) -> MediaResult<()> {
        for dir in [
            self.temp_dir(),
            self.instrumentals_dir(),
            self.acapellas_dir(),
            self.videos_dir(),
        ] {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub fn video_path(&self, title: &str) -> PathBuf {
        self.videos_dir()
            .join(format!("{}{}.mp4", safe_stem(title), VIDEO_SUFFIX))
    }

    pub fn metadata_path(&self, title: &str) -> PathBuf {
        self.videos_dir()
            .join(format!("{}_metadata.json", safe_stem(title)))
    }

    pub fn instrumental_path(&self, title: &str) -> PathBuf {
        self.instrumentals_dir()
            .join(format!("{}.mp3", safe_stem(title)))
    }

    pub fn acapella_path(&self, title: &str) -> PathBuf {
        self.acapellas_dir().join(format!("{}.mp3", safe_stem(title)))
    }

    /// Every artifact an item may leave behind.
    pub fn item_artifacts(&self, title: &str) -> Vec<PathBuf> {
        vec![
            self.video_path(title),
            self.metadata_path(title),
            self.instrumental_path(title),
            self.acapella_path(title),
        ]
    }

    /// Delete an item's artifacts, skipping ones that are already gone.
    ///
    /// Returns the paths that were removed, or the first IO error.
    pub async fn remove_item_artifacts(&self, title: &str) -> MediaResult<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in self.item_artifacts(title) {
            if remove_if_exists(&path).await? {
                debug!("Removed {}", path.display());
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new("output")
    }
}
