//! Media collaborator configuration.

use std::sync::Arc;

use crate::enhance::{FfmpegEnhancer, PassthroughEnhancer};
use crate::layout::ArtifactLayout;
use crate::traits::AudioEnhancer;

/// Media configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Root of the artifact layout
    pub output_dir: String,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    /// Python interpreter with Demucs installed
    pub python_bin: String,
    pub demucs_model: String,
    /// `cpu`, `cuda` or `mps`
    pub demucs_device: String,
    /// Loudness target in LUFS
    pub target_lufs: f64,
    pub enable_mastering: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            python_bin: "python3".to_string(),
            demucs_model: "htdemucs_ft".to_string(),
            demucs_device: "cpu".to_string(),
            target_lufs: -14.0,
            enable_mastering: true,
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(defaults.output_dir),
            ytdlp_bin: std::env::var("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            python_bin: std::env::var("PYTHON_BIN").unwrap_or(defaults.python_bin),
            demucs_model: std::env::var("DEMUCS_MODEL").unwrap_or(defaults.demucs_model),
            demucs_device: std::env::var("DEMUCS_DEVICE").unwrap_or(defaults.demucs_device),
            target_lufs: std::env::var("TARGET_LUFS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.target_lufs),
            enable_mastering: std::env::var("ENABLE_MASTERING")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enable_mastering),
        }
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.output_dir)
    }

    /// Enhancer honouring `enable_mastering`.
    pub fn enhancer(&self) -> Arc<dyn AudioEnhancer> {
        if self.enable_mastering {
            Arc::new(FfmpegEnhancer::new(&self.ffmpeg_bin, self.target_lufs))
        } else {
            Arc::new(PassthroughEnhancer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MediaConfig::default();
        assert_eq!(config.layout().root(), std::path::Path::new("output"));
        assert_eq!(config.demucs_model, "htdemucs_ft");
        assert!(config.enable_mastering);
    }
}
