//! Fetch-retry-merge pipeline.
//!
//! State machine driven by [`PipelineOrchestrator`]:
//!
//! ```text
//! Idle -> SelectingStreams -> FetchingVideo -> FetchingAudio -> Merging -> Done
//! ```
//!
//! With [`FetchMode::Parallel`] the two fetch states collapse into
//! `FetchingStreams`. Every transition is emitted as
//! [`PipelineEvent::StateChanged`](crate::progress::PipelineEvent::StateChanged).

mod error;
mod orchestrator;

pub use error::{InputError, PipelineFailure, StageError};
pub use orchestrator::PipelineOrchestrator;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Resolving the source and choosing streams.
    SelectingStreams,
    /// Fetching the video stream (sequential mode).
    FetchingVideo,
    /// Fetching the audio stream (sequential mode).
    FetchingAudio,
    /// Fetching both streams concurrently (parallel mode).
    FetchingStreams,
    /// Combining the artifacts.
    Merging,
    /// Terminal outcome reached.
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::SelectingStreams => "selecting streams",
            Self::FetchingVideo => "fetching video",
            Self::FetchingAudio => "fetching audio",
            Self::FetchingStreams => "fetching streams",
            Self::Merging => "merging",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Catalog resolution or stream selection.
    Selection,
    /// Video fetch, including creation of the asset directory.
    VideoFetch,
    /// Audio fetch.
    AudioFetch,
    /// Merge.
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Selection => "stream selection",
            Self::VideoFetch => "video fetch",
            Self::AudioFetch => "audio fetch",
            Self::Merge => "merge",
        };
        f.write_str(label)
    }
}

/// How the two streams are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Video, then audio.
    #[default]
    Sequential,
    /// Both at once; the first failure cancels the other.
    Parallel,
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown fetch mode '{other}': expected 'sequential' or 'parallel'"
            )),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        })
    }
}

/// A validated pipeline input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    source_id: String,
    output_root: PathBuf,
}

impl PipelineRequest {
    /// Validates the source identifier and output directory.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] for a blank source, an empty path, a path that
    /// is not an existing directory, or a read-only directory.
    pub fn new(
        source_id: impl Into<String>,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self, InputError> {
        let source_id = source_id.into().trim().to_string();
        if source_id.is_empty() {
            return Err(InputError::MissingSource);
        }

        let output_root = output_root.into();
        if output_root.as_os_str().is_empty() {
            return Err(InputError::MissingOutputDir);
        }

        let metadata = match std::fs::metadata(&output_root) {
            Ok(meta) if meta.is_dir() => meta,
            _ => return Err(InputError::OutputDirNotFound { path: output_root }),
        };
        if metadata.permissions().readonly() {
            return Err(InputError::OutputDirReadOnly { path: output_root });
        }

        Ok(Self {
            source_id,
            output_root,
        })
    }

    /// Opaque source locator.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Directory the per-asset directory is created in.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}
