//! Merge stage: combine the fetched video and audio artifacts into one file.
//!
//! The [`Muxer`] trait performs the actual container work; [`FfmpegMuxer`]
//! is the shipped implementation. [`MergeStage`] owns the sequencing around
//! it:
//!
//! 1. both inputs must exist,
//! 2. on muxer failure any partial output is removed and the inputs stay,
//! 3. on success both inputs are deleted (best effort).

mod error;
mod ffmpeg;

pub use error::MergeError;
pub use ffmpeg::{AUDIO_CODEC, DEFAULT_FFMPEG_PROGRAM, FfmpegMuxer, VIDEO_CODEC};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::download::FetchJob;
use crate::media::StreamKind;

/// Combines a video file and an audio file into `output`.
///
/// The audio input replaces any audio embedded in the video input.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Writes the combined file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when the inputs cannot be read or the output
    /// cannot be written.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError>;
}

/// Paths for one merge. Only buildable from two succeeded fetch jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    video: PathBuf,
    audio: PathBuf,
    output: PathBuf,
}

impl MergeRequest {
    /// Pairs the artifacts of two completed fetches with an output path.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InputNotReady`] when either job has not
    /// succeeded or the jobs are not one video and one audio fetch.
    pub fn from_jobs(
        video: &FetchJob,
        audio: &FetchJob,
        output: impl Into<PathBuf>,
    ) -> Result<Self, MergeError> {
        for (job, expected) in [(video, StreamKind::Video), (audio, StreamKind::Audio)] {
            if job.kind() != expected || !job.is_succeeded() {
                return Err(MergeError::InputNotReady {
                    kind: job.kind(),
                    state: job.state,
                });
            }
        }
        Ok(Self {
            video: video.destination_path.clone(),
            audio: audio.destination_path.clone(),
            output: output.into(),
        })
    }

    /// Video artifact path.
    #[must_use]
    pub fn video_path(&self) -> &Path {
        &self.video
    }

    /// Audio artifact path.
    #[must_use]
    pub fn audio_path(&self) -> &Path {
        &self.audio
    }

    /// Merged output path.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

/// Runs a [`Muxer`] and manages the artifacts around it.
#[derive(Clone)]
pub struct MergeStage {
    muxer: Arc<dyn Muxer>,
}

impl std::fmt::Debug for MergeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeStage").finish_non_exhaustive()
    }
}

impl MergeStage {
    /// Creates a merge stage over the given muxer.
    #[must_use]
    pub fn new(muxer: Arc<dyn Muxer>) -> Self {
        Self { muxer }
    }

    /// Merges the request and returns the output path.
    ///
    /// On success the two inputs are deleted; a failed delete is logged and
    /// otherwise ignored. On failure the inputs are left untouched and no
    /// output file remains.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when an input is missing or the muxer fails.
    #[instrument(skip(self, request), fields(output = %request.output.display()))]
    pub async fn merge(&self, request: &MergeRequest) -> Result<PathBuf, MergeError> {
        ensure_input(&request.video).await?;
        ensure_input(&request.audio).await?;

        if let Err(error) = self
            .muxer
            .mux(&request.video, &request.audio, &request.output)
            .await
        {
            warn!(error = %error, "merge failed, keeping intermediates");
            remove_partial_output(&request.output).await;
            return Err(error);
        }

        if !tokio::fs::try_exists(&request.output)
            .await
            .map_err(|e| MergeError::io(&request.output, e))?
        {
            return Err(MergeError::NoOutput {
                path: request.output.clone(),
            });
        }

        info!(path = %request.output.display(), "merge complete");

        for input in [&request.video, &request.audio] {
            match tokio::fs::remove_file(input).await {
                Ok(()) => debug!(path = %input.display(), "removed intermediate"),
                Err(e) => warn!(path = %input.display(), error = %e, "failed to remove intermediate"),
            }
        }

        Ok(request.output.clone())
    }
}

async fn ensure_input(path: &Path) -> Result<(), MergeError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(MergeError::MissingInput {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(MergeError::MissingInput {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(MergeError::io(path, e)),
    }
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial output"),
    }
}
