//! Audio acquisition and playlist expansion via yt-dlp.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};
use crate::layout::ArtifactLayout;
use crate::traits::{AcquiredAudio, CancelSignal, MediaAcquirer, PlaylistExpander};

/// Downloads the best audio stream of a URL as MP3.
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    ytdlp_bin: String,
    audio_quality: String,
}

impl YtDlpAcquirer {
    pub fn new(ytdlp_bin: impl Into<String>) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
            audio_quality: "192K".to_string(),
        }
    }

    pub fn with_audio_quality(mut self, quality: impl Into<String>) -> Self {
        self.audio_quality = quality.into();
        self
    }

    fn build_args(&self, url: &str, layout: &ArtifactLayout) -> Vec<String> {
        let template = layout.temp_dir().join("%(title)s.%(ext)s");
        vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "--no-playlist".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            url.to_string(),
        ]
    }
}

impl Default for YtDlpAcquirer {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MediaAcquirer for YtDlpAcquirer {
    async fn acquire(
        &self,
        url: &str,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<AcquiredAudio> {
        layout.ensure_dirs().await?;
        info!(url = %url, "Downloading audio");

        let output = ToolRunner::new(&self.ytdlp_bin)
            .with_cancel(cancel)
            .run(self.build_args(url, layout))
            .await?;

        let audio_path = output
            .stdout_lines()
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| MediaError::command_failed(&self.ytdlp_bin, "no output file reported", None))?;

        if !audio_path.exists() {
            return Err(MediaError::output_missing(audio_path));
        }

        let title = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| MediaError::output_missing(&audio_path))?;

        info!(title = %title, path = %audio_path.display(), "Downloaded audio");
        Ok(AcquiredAudio { title, audio_path })
    }
}

/// Lists the member URLs of a playlist without downloading anything.
#[derive(Debug, Clone)]
pub struct YtDlpPlaylistExpander {
    ytdlp_bin: String,
}

impl YtDlpPlaylistExpander {
    pub fn new(ytdlp_bin: impl Into<String>) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
        }
    }
}

impl Default for YtDlpPlaylistExpander {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl PlaylistExpander for YtDlpPlaylistExpander {
    async fn expand(&self, url: &str) -> MediaResult<Vec<String>> {
        let output = ToolRunner::new(&self.ytdlp_bin)
            .run(["--flat-playlist", "--print", "url", url])
            .await?;

        let urls: Vec<String> = output.stdout_lines().map(str::to_string).collect();
        info!(url = %url, count = urls.len(), "Expanded playlist");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_args() {
        let layout = ArtifactLayout::new("out");
        let args = YtDlpAcquirer::default().build_args("https://youtu.be/x", &layout);

        assert_eq!(args.first().unwrap(), "-x");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"after_move:filepath".to_string()));
        assert!(args.contains(&"out/temp/%(title)s.%(ext)s".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let expander = YtDlpPlaylistExpander::new("no-such-yt-dlp-binary");
        let err = expander.expand("https://youtube.com/playlist?list=PL1").await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }
}
