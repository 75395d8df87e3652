//! Application runtime composition: settings, wiring and the run loop.

pub(crate) mod config;
pub(crate) mod progress_ui;
pub(crate) mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use avfetch_core::catalog::ManifestCatalog;
use avfetch_core::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, HttpTransport,
    READ_TIMEOUT_SECS, RetryPolicy, RetryingFetcher, build_client,
};
use avfetch_core::merge::{DEFAULT_FFMPEG_PROGRAM, FfmpegMuxer, MergeStage};
use avfetch_core::pipeline::{FetchMode, PipelineFailure, PipelineOrchestrator, PipelineRequest};
use avfetch_core::progress::ChannelSink;
use avfetch_core::selector::{DEFAULT_RESOLUTION_FLOOR, StreamSelector};
use tracing::{debug, info};

use crate::ProcessExit;
use crate::cli::Args;
use config::FileConfig;
use progress_ui::RunSummary;

/// Effective run settings after merging CLI flags, file config and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub source: String,
    pub output_dir: PathBuf,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub resolution_floor: u32,
    pub fetch_mode: FetchMode,
    pub ffmpeg_path: PathBuf,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Settings {
    /// CLI flags win over file values, which win over built-in defaults.
    ///
    /// A missing source or output directory is left empty so that request
    /// validation reports it.
    pub(crate) fn resolve(args: &Args, file: FileConfig) -> Self {
        let fetch_mode = if args.parallel {
            FetchMode::Parallel
        } else {
            file.fetch_mode.unwrap_or_default()
        };
        Self {
            source: args.source.clone().unwrap_or_default(),
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_default(),
            max_attempts: args
                .max_attempts
                .or(file.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_delay: args
                .retry_delay_ms
                .or(file.retry_delay_ms)
                .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis),
            resolution_floor: args
                .resolution_floor
                .or(file.resolution_floor)
                .unwrap_or(DEFAULT_RESOLUTION_FLOOR),
            fetch_mode,
            ffmpeg_path: args
                .ffmpeg
                .clone()
                .or(file.ffmpeg_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG_PROGRAM)),
            connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        }
    }
}

pub(crate) async fn run(args: Args) -> Result<ProcessExit> {
    let file_config = config::load_file_config(args.config.as_deref())?;
    let settings = Settings::resolve(&args, file_config);
    debug!(?settings, "settings resolved");

    let request = match PipelineRequest::new(settings.source.as_str(), &settings.output_dir) {
        Ok(request) => request,
        Err(error) => {
            eprintln!("Error: {error}");
            return Ok(ProcessExit::Failure);
        }
    };

    let client = build_client(settings.connect_timeout_secs, settings.read_timeout_secs)
        .context("Failed to initialize HTTP client")?;
    let catalog = Arc::new(ManifestCatalog::with_client(client.clone()));
    let transport = Arc::new(HttpTransport::with_client(client));
    let fetcher = RetryingFetcher::new(
        transport,
        RetryPolicy::new(settings.max_attempts, settings.retry_delay),
    );
    let merge_stage = MergeStage::new(Arc::new(FfmpegMuxer::new(&settings.ffmpeg_path)));

    let (sink, events) = ChannelSink::new();
    let orchestrator = PipelineOrchestrator::new(catalog, fetcher, merge_stage, Arc::new(sink))
        .with_selector(StreamSelector::with_floor(settings.resolution_floor))
        .with_fetch_mode(settings.fetch_mode);

    info!(source = %request.source_id(), mode = %settings.fetch_mode, "avfetch starting");
    let ui = progress_ui::spawn_progress_ui(events, terminal::progress_enabled(args.quiet));
    let outcome = orchestrator
        .spawn(request)
        .await
        .context("Pipeline task panicked")?;
    let summary = ui.await.context("Progress renderer panicked")?;
    if let Some(summary) = &summary {
        debug!(success = summary.success, "finished event received");
    }

    let line = completion_line(outcome.as_ref().map(PathBuf::as_path), summary);
    if outcome.is_ok() {
        if !args.quiet {
            println!("{line}");
        }
        Ok(ProcessExit::Success)
    } else {
        eprintln!("{line}");
        Ok(ProcessExit::Failure)
    }
}

/// Final line shown to the user: the pipeline's own `Finished` message, or
/// one rebuilt from the outcome if the event never arrived.
fn completion_line(
    outcome: Result<&Path, &PipelineFailure>,
    summary: Option<RunSummary>,
) -> String {
    if let Some(summary) = summary {
        return summary.message;
    }
    match outcome {
        Ok(path) => format!("Downloaded to {}", path.display()),
        Err(failure) => format!("Error: {failure}"),
    }
}
