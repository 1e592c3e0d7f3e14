//! External tool runner and FFmpeg command builder.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::traits::CancelSignal;

/// Captured output of a finished tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Non-empty, trimmed stdout lines.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Runs one external tool with optional cancellation.
///
/// The child is killed as soon as the cancellation signal fires; the run
/// then fails with [`MediaError::Cancelled`].
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    cancel_rx: Option<CancelSignal>,
}

impl ToolRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cancel_rx: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: Option<CancelSignal>) -> Self {
        self.cancel_rx = cancel_rx;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check the program is available.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::tool_not_found(&self.program))
    }

    /// Run the program to completion.
    pub async fn run<I, S>(&self, args: I) -> MediaResult<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.check()?;

        if is_cancelled(&self.cancel_rx) {
            return Err(MediaError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(program = %self.program, "Running {:?}", command.as_std());

        let child = command.spawn()?;
        let output = child.wait_with_output();

        // Dropping the pending output future drops the child, which kills it.
        let output = match self.cancel_rx.clone() {
            Some(mut cancel_rx) => {
                tokio::select! {
                    result = output => result?,
                    _ = cancelled(&mut cancel_rx) => {
                        info!(program = %self.program, "Cancelled, killing process");
                        return Err(MediaError::Cancelled);
                    }
                }
            }
            None => output.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            debug!(program = %self.program, "stderr: {}", stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .unwrap_or("exited with non-zero status");
            return Err(MediaError::command_failed(
                &self.program,
                message,
                output.status.code(),
            ));
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

fn is_cancelled(cancel_rx: &Option<CancelSignal>) -> bool {
    cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Resolves once the signal reads `true`. Never resolves if the sender is gone.
async fn cancelled(cancel_rx: &mut CancelSignal) {
    loop {
        if *cancel_rx.borrow_and_update() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// One `-i` input with its preceding arguments.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a file input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with(Vec::<String>::new(), path.as_ref().to_string_lossy())
    }

    /// Add an input preceded by input arguments (e.g. `-f lavfi`).
    pub fn input_with<I, S>(mut self, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add output arguments.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Stop at the end of the shortest input.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Run with the given FFmpeg binary.
    pub async fn run(&self, ffmpeg_bin: &str, cancel: Option<CancelSignal>) -> MediaResult<()> {
        ToolRunner::new(ffmpeg_bin)
            .with_cancel(cancel)
            .run(self.build_args())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::watch;

    #[test]
    fn test_command_builder_orders_inputs() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input_with(["-f", "lavfi"], "color=c=black:s=1920x1080")
            .input("song.mp3")
            .filter_complex("[0:v][1:a]concat")
            .map("[outv]")
            .map("1:a")
            .video_codec("libx264")
            .crf(20);

        let args = cmd.build_args();
        assert_eq!(&args[..3], &["-y", "-v", "error"]);

        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[first_input - 2], "-f");
        assert_eq!(args[first_input + 1], "color=c=black:s=1920x1080");

        let second_input = args.iter().rposition(|a| a == "-i").unwrap();
        assert_eq!(args[second_input + 1], "song.mp3");

        let filter = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(filter > second_input);
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert!(args.contains(&"20".to_string()));
    }

    #[test]
    fn test_audio_filter() {
        let args = FfmpegCommand::new("b.mp3")
            .input("a.mp3")
            .audio_filter("loudnorm=I=-14")
            .build_args();
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], "loudnorm=I=-14");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let err = ToolRunner::new("definitely-not-a-real-tool-xyz")
            .run(["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_failure() {
        let out = ToolRunner::new("sh")
            .run(["-c", "echo one; echo; echo two"])
            .await
            .unwrap();
        assert_eq!(out.stdout_lines().collect::<Vec<_>>(), vec!["one", "two"]);

        let err = ToolRunner::new("sh")
            .run(["-c", "echo bad thing >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            MediaError::CommandFailed { message, exit_code, .. } => {
                assert_eq!(message, "bad thing");
                assert_eq!(exit_code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_child() {
        let (tx, rx) = watch::channel(false);
        let runner = ToolRunner::new("sh").with_cancel(Some(rx));

        let handle = tokio::spawn(async move { runner.run(["-c", "sleep 30"]).await });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tx.send_replace(true);

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(MediaError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let (_tx, rx) = watch::channel(true);
        let result = ToolRunner::new("sh").with_cancel(Some(rx)).run(["-c", "true"]).await;
        assert!(matches!(result, Err(MediaError::Cancelled)));
    }
}
