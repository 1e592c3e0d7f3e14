//! Media collaborators for the Vocalless pipeline.
//!
//! Each stage of an item's processing (acquire, separate, enhance, render)
//! is a trait with a CLI-backed implementation:
//! - `yt-dlp` for audio acquisition and playlist expansion
//! - Demucs for vocal separation
//! - FFmpeg for loudness mastering and video rendering
//!
//! Every tool run accepts an optional cancellation signal and kills its
//! child process when the signal fires.

pub mod acquire;
pub mod command;
pub mod config;
pub mod enhance;
pub mod error;
pub mod fs_utils;
pub mod layout;
pub mod render;
pub mod separate;
pub mod traits;

pub use acquire::{YtDlpAcquirer, YtDlpPlaylistExpander};
pub use command::{FfmpegCommand, ToolOutput, ToolRunner};
pub use config::MediaConfig;
pub use enhance::{FfmpegEnhancer, PassthroughEnhancer};
pub use error::{MediaError, MediaResult};
pub use layout::{safe_stem, ArtifactLayout};
pub use render::FfmpegRenderer;
pub use separate::DemucsSeparator;
pub use traits::{
    AcquiredAudio, AudioEnhancer, CancelSignal, MediaAcquirer, PlaylistExpander, SeparatedStems,
    SourceSeparator, VideoRenderer,
};
