//! Loudness mastering.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::fs_utils::move_file;
use crate::traits::{AudioEnhancer, CancelSignal};

/// EBU R128 loudness normalization with FFmpeg's `loudnorm`.
#[derive(Debug, Clone)]
pub struct FfmpegEnhancer {
    ffmpeg_bin: String,
    target_lufs: f64,
    true_peak: f64,
    loudness_range: f64,
}

impl FfmpegEnhancer {
    pub fn new(ffmpeg_bin: impl Into<String>, target_lufs: f64) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            target_lufs,
            true_peak: -1.0,
            loudness_range: 11.0,
        }
    }

    fn filter(&self) -> String {
        format!(
            "loudnorm=I={}:TP={}:LRA={}",
            self.target_lufs, self.true_peak, self.loudness_range
        )
    }

    fn build_command(&self, audio: &Path, tmp: &Path) -> FfmpegCommand {
        FfmpegCommand::new(tmp)
            .input(audio)
            .audio_filter(self.filter())
            .audio_codec("libmp3lame")
            .audio_bitrate("320k")
    }
}

impl Default for FfmpegEnhancer {
    fn default() -> Self {
        Self::new("ffmpeg", -14.0)
    }
}

#[async_trait]
impl AudioEnhancer for FfmpegEnhancer {
    async fn enhance(&self, audio: &Path, cancel: Option<CancelSignal>) -> MediaResult<()> {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = audio.with_file_name(format!("{}.mastering.mp3", stem));

        info!(target_lufs = self.target_lufs, "Mastering {}", audio.display());
        let result = self.build_command(audio, &tmp).run(&self.ffmpeg_bin, cancel).await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        move_file(&tmp, audio).await
    }
}

/// Leaves audio untouched; used when mastering is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEnhancer;

#[async_trait]
impl AudioEnhancer for PassthroughEnhancer {
    async fn enhance(&self, _audio: &Path, _cancel: Option<CancelSignal>) -> MediaResult<()> {
        Ok(())
    }
}
