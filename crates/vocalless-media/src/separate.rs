//! Vocal separation via Demucs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;
use crate::layout::ArtifactLayout;
use crate::traits::{AcquiredAudio, CancelSignal, SeparatedStems, SourceSeparator};

/// Two-stem (vocals / no vocals) separation with a Demucs model.
#[derive(Debug, Clone)]
pub struct DemucsSeparator {
    python_bin: String,
    model: String,
    device: String,
}

impl DemucsSeparator {
    pub fn new(python_bin: impl Into<String>, model: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
            model: model.into(),
            device: device.into(),
        }
    }

    fn scratch_dir(layout: &ArtifactLayout) -> PathBuf {
        layout.temp_dir().join("separated")
    }

    fn build_args(&self, audio: &Path, out_dir: &Path) -> Vec<String> {
        vec![
            "-m".to_string(),
            "demucs".to_string(),
            "--two-stems=vocals".to_string(),
            "-n".to_string(),
            self.model.clone(),
            "-o".to_string(),
            out_dir.to_string_lossy().to_string(),
            "--device".to_string(),
            self.device.clone(),
            "--mp3".to_string(),
            audio.to_string_lossy().to_string(),
        ]
    }

    /// Directory Demucs writes the stems of `audio` into.
    fn stem_dir(&self, out_dir: &Path, audio: &Path) -> PathBuf {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        out_dir.join(&self.model).join(stem)
    }
}

impl Default for DemucsSeparator {
    fn default() -> Self {
        Self::new("python3", "htdemucs_ft", "cpu")
    }
}

#[async_trait]
impl SourceSeparator for DemucsSeparator {
    async fn separate(
        &self,
        audio: &AcquiredAudio,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<SeparatedStems> {
        let out_dir = Self::scratch_dir(layout);
        info!(model = %self.model, device = %self.device, "Separating vocals");

        ToolRunner::new(&self.python_bin)
            .with_cancel(cancel)
            .run(self.build_args(&audio.audio_path, &out_dir))
            .await?;

        let stem_dir = self.stem_dir(&out_dir, &audio.audio_path);
        let no_vocals = stem_dir.join("no_vocals.mp3");
        let vocals = stem_dir.join("vocals.mp3");

        if !no_vocals.exists() {
            return Err(MediaError::output_missing(no_vocals));
        }

        let instrumental = layout.instrumental_path(&audio.title);
        move_file(&no_vocals, &instrumental).await?;

        let acapella = if vocals.exists() {
            let target = layout.acapella_path(&audio.title);
            move_file(&vocals, &target).await?;
            Some(target)
        } else {
            None
        };

        if let Err(e) = tokio::fs::remove_dir_all(&stem_dir).await {
            warn!("Failed to remove {}: {}", stem_dir.display(), e);
        }
        if let Err(e) = tokio::fs::remove_file(&audio.audio_path).await {
            warn!("Failed to remove {}: {}", audio.audio_path.display(), e);
        }

        Ok(SeparatedStems {
            instrumental,
            acapella,
        })
    }
}
