//! avfetch core library
//!
//! Fetches the separate video and audio streams of one media asset, retrying
//! each with a fixed delay, and muxes them into a single MP4 with ffmpeg.
//!
//! # Architecture
//!
//! - [`catalog`] - resolves a source identifier into a title and stream list
//! - [`selector`] - picks one video (720p floor rule) and one audio stream
//! - [`download`] - HTTP transport, retry policy and the retrying fetcher
//! - [`merge`] - ffmpeg muxing and cleanup of intermediate files
//! - [`pipeline`] - the orchestrator sequencing the stages above
//! - [`progress`] - events pushed to the caller while a run is in flight
//! - [`media`] - shared value types and filename rules

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod download;
pub mod media;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod selector;

// Re-export commonly used types
pub use catalog::{CatalogEntry, ManifestCatalog, ResolutionError, StreamCatalog};
pub use download::{
    DownloadError, FetchError, FetchJob, FetchState, HttpTransport, RetryPolicy, RetryingFetcher,
    Transport,
};
pub use media::{Asset, Resolution, StreamDescriptor, StreamKind};
pub use merge::{FfmpegMuxer, MergeError, MergeRequest, MergeStage, Muxer};
pub use pipeline::{
    FetchMode, InputError, PipelineFailure, PipelineOrchestrator, PipelineRequest, PipelineState,
    Stage, StageError,
};
pub use progress::{ChannelSink, FetchProgress, NullSink, PipelineEvent, ProgressSink};
pub use selector::{SelectedStreams, SelectionError, StreamSelector, select_streams};
