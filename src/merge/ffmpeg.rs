//! `ffmpeg`-backed muxer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{MergeError, Muxer};

/// Program looked up on `PATH` when none is configured.
pub const DEFAULT_FFMPEG_PROGRAM: &str = "ffmpeg";

/// Output video codec, applied regardless of the input codec.
pub const VIDEO_CODEC: &str = "libx264";

/// Output audio codec, applied regardless of the input codec.
pub const AUDIO_CODEC: &str = "aac";

/// Muxes with an external `ffmpeg` process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG_PROGRAM)
    }
}

impl FfmpegMuxer {
    /// Creates a muxer that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program this muxer runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument vector: video from input 0, audio from input 1,
    /// re-encoded to H.264/AAC in a faststart MP4.
    #[must_use]
    pub fn build_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push("-i".into());
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        args.extend(
            [
                "-map", "0:v:0", "-map", "1:a:0", "-c:v", VIDEO_CODEC, "-c:a", AUDIO_CODEC,
                "-movflags", "+faststart", "-shortest",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        let args = Self::build_args(video, audio, output);
        debug!(?args, "running ffmpeg");

        let command_output = Command::new(&self.program)
            .args(&args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MergeError::spawn(&self.program, e))?;

        if !command_output.status.success() {
            let stderr = String::from_utf8_lossy(&command_output.stderr);
            let message = last_error_line(&stderr)
                .unwrap_or("unknown ffmpeg error")
                .to_string();
            return Err(MergeError::muxer(
                command_output.status.code().unwrap_or(-1),
                message,
            ));
        }

        Ok(())
    }
}

fn last_error_line(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).rfind(|line| !line.is_empty())
}
