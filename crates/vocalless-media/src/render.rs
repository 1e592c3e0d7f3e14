//! Spectrum video rendering.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::layout::ArtifactLayout;
use crate::traits::{CancelSignal, VideoRenderer};

const LABEL: &str = "INSTRUMENTAL REMASTER";

/// Renders a 1080p H.264/AAC video: a generated title card with a
/// frequency spectrum of the audio overlaid along the bottom.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    ffmpeg_bin: String,
    width: u32,
    height: u32,
    background: String,
    crf: u8,
    preset: String,
}

impl FfmpegRenderer {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            width: 1920,
            height: 1080,
            background: "0x141422".to_string(),
            crf: 20,
            preset: "medium".to_string(),
        }
    }

    fn background_source(&self) -> String {
        format!("color=c={}:s={}x{}:r=30", self.background, self.width, self.height)
    }

    fn filter_graph(&self, title: &str) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "[0:v]drawtext=text='{title}':fontcolor=white:fontsize=64:x=(w-text_w)/2:y=h*0.22,\
             drawtext=text='{label}':fontcolor=0xb4b4c8:fontsize=36:x=(w-text_w)/2:y=h*0.22+100[bg];\
             [1:a]showfreqs=s={w}x{spec_h}:mode=line:colors=white:fscale=log:ascale=sqrt:win_size=4096,\
             scale={w}:{scaled_h},colorkey=0x000000:0.01:0.1,gblur=sigma=8:steps=4[glow];\
             [bg][glow]overlay=0:H-h-100:format=auto[outv]",
            title = escape_drawtext(title),
            label = LABEL,
            w = w,
            spec_h = h * 10 / 9,
            scaled_h = h * 5 / 6,
        )
    }

    fn build_command(&self, audio: &Path, title: &str, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input_with(["-f", "lavfi"], self.background_source())
            .input(audio)
            .filter_complex(self.filter_graph(title))
            .map("[outv]")
            .map("1:a")
            .video_codec("libx264")
            .preset(self.preset.clone())
            .crf(self.crf)
            .audio_codec("aac")
            .audio_bitrate("192k")
            .shortest()
            .pixel_format("yuv420p")
            .output_args(["-movflags", "+faststart"])
    }
}

impl Default for FfmpegRenderer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Make a title safe inside a single-quoted `drawtext` value.
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\'' => out.push('\u{2019}'),
            '\\' => {}
            ':' | '%' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[async_trait]
impl VideoRenderer for FfmpegRenderer {
    async fn render(
        &self,
        audio: &Path,
        title: &str,
        layout: &ArtifactLayout,
        cancel: Option<CancelSignal>,
    ) -> MediaResult<PathBuf> {
        let output = layout.video_path(title);
        tokio::fs::create_dir_all(layout.videos_dir()).await?;

        info!(title = %title, "Rendering video");
        self.build_command(audio, title, &output)
            .run(&self.ffmpeg_bin, cancel)
            .await?;

        if !output.exists() {
            return Err(MediaError::output_missing(output));
        }
        Ok(output)
    }
}
