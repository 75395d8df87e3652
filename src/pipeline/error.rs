//! Error types for the pipeline: input validation and the aggregated failure.

use std::path::PathBuf;

use thiserror::Error;

use super::Stage;
use crate::catalog::ResolutionError;
use crate::download::FetchError;
use crate::merge::MergeError;
use crate::selector::SelectionError;

/// Caller mistakes caught before any network activity.
#[derive(Debug, Error)]
pub enum InputError {
    /// No source identifier was given.
    #[error("no source given: enter a URL to download")]
    MissingSource,

    /// No output directory was given.
    #[error("no output directory chosen")]
    MissingOutputDir,

    /// The output directory does not exist or is not a directory.
    #[error("output directory does not exist: {path}")]
    OutputDirNotFound {
        /// The rejected path.
        path: PathBuf,
    },

    /// The output directory cannot be written to.
    #[error("output directory is read-only: {path}")]
    OutputDirReadOnly {
        /// The rejected path.
        path: PathBuf,
    },
}

/// The component error behind a pipeline failure.
#[derive(Debug, Error)]
pub enum StageError {
    /// The catalog could not resolve the source.
    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    /// No suitable streams were offered.
    #[error("{0}")]
    Selection(#[from] SelectionError),

    /// A stream could not be fetched.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The merge stage failed.
    #[error("{0}")]
    Merge(#[from] MergeError),

    /// The per-asset directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    Io {
        /// Directory being created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
#[error("{stage} failed: {cause}")]
pub struct PipelineFailure {
    /// Stage the failure happened in.
    pub stage: Stage,
    /// Component error, unmodified.
    #[source]
    pub cause: StageError,
}

impl PipelineFailure {
    /// Wraps a component error with its stage.
    pub fn new(stage: Stage, cause: impl Into<StageError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}
