//! Best-effort removal of an item's local artifacts.

use tracing::{debug, warn};
use vocalless_media::ArtifactLayout;
use vocalless_models::ItemResult;

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub attempted: bool,
    pub files_deleted: bool,
}

/// Deletes the conventional artifacts of an item once it is finished.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    layout: ArtifactLayout,
}

impl CleanupPolicy {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Remove every artifact derived from `title`. Failures are logged only.
    pub async fn apply(&self, title: &str) -> CleanupOutcome {
        match self.layout.remove_item_artifacts(title).await {
            Ok(removed) => {
                debug!(title = %title, count = removed.len(), "Removed local artifacts");
                CleanupOutcome {
                    attempted: true,
                    files_deleted: true,
                }
            }
            Err(e) => {
                warn!(title = %title, "Cleanup failed: {}", e);
                CleanupOutcome {
                    attempted: true,
                    files_deleted: false,
                }
            }
        }
    }

    /// Apply and record the outcome on the item's result.
    pub async fn apply_to(&self, title: &str, result: &mut ItemResult) {
        let outcome = self.apply(title).await;
        result.cleanup_attempted = outcome.attempted;
        result.files_deleted = outcome.files_deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_apply_removes_item_files_only() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();

        for path in layout.item_artifacts("Song") {
            tokio::fs::write(&path, b"x").await.unwrap();
        }
        tokio::fs::write(layout.video_path("Other"), b"x").await.unwrap();

        let mut result = ItemResult::succeeded("src", "Song", "v.mp4");
        CleanupPolicy::new(layout.clone()).apply_to("Song", &mut result).await;

        assert!(result.cleanup_attempted);
        assert!(result.files_deleted);
        assert!(layout.item_artifacts("Song").iter().all(|p| !p.exists()));
        assert!(layout.video_path("Other").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_is_recorded_not_raised() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();

        // A directory where a file is expected cannot be removed with remove_file.
        tokio::fs::create_dir_all(layout.video_path("Song")).await.unwrap();

        let outcome = CleanupPolicy::new(layout).apply("Song").await;
        assert!(outcome.attempted);
        assert!(!outcome.files_deleted);
    }
}
