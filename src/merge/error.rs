//! Error types for the merge stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::FetchState;
use crate::media::StreamKind;

/// Errors from combining the video and audio artifacts.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A fetch job handed to the merge stage had not succeeded.
    #[error("{kind} artifact is not ready for merging (state {state:?})")]
    InputNotReady {
        /// Stream kind of the offending job.
        kind: StreamKind,
        /// State the job was in.
        state: FetchState,
    },

    /// An input artifact is not on disk.
    #[error("merge input missing: {path}")]
    MissingInput {
        /// Expected input path.
        path: PathBuf,
    },

    /// The muxer executable could not be started.
    #[error("failed to start muxer {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The muxer ran and reported failure.
    #[error("muxer failed with exit code {code}: {message}")]
    Muxer {
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Last error line the muxer printed.
        message: String,
    },

    /// The muxer reported success but wrote nothing.
    #[error("muxer produced no output at {path}")]
    NoOutput {
        /// Expected output path.
        path: PathBuf,
    },

    /// File system error inspecting an artifact.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Creates a spawn error.
    pub fn spawn(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a muxer failure error.
    pub fn muxer(code: i32, message: impl Into<String>) -> Self {
        Self::Muxer {
            code,
            message: message.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
