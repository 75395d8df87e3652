//! Sequences selection, fetch and merge for one asset.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::error::{PipelineFailure, StageError};
use super::{FetchMode, PipelineRequest, PipelineState, Stage};
use crate::catalog::StreamCatalog;
use crate::download::{FetchError, FetchJob, RetryingFetcher};
use crate::media::{Asset, StreamDescriptor, artifact_filename, merged_filename};
use crate::merge::{MergeRequest, MergeStage};
use crate::progress::{PipelineEvent, ProgressSink};
use crate::selector::StreamSelector;

/// Drives one pipeline run from source identifier to merged file.
///
/// Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    catalog: Arc<dyn StreamCatalog>,
    fetcher: RetryingFetcher,
    merge_stage: MergeStage,
    selector: StreamSelector,
    mode: FetchMode,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("fetcher", &self.fetcher)
            .field("selector", &self.selector)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Where the streams of one asset are written.
struct AssetLayout {
    title: String,
    safe_title: String,
    dir: PathBuf,
}

impl AssetLayout {
    fn new(asset: &Asset, root: &Path) -> Self {
        let safe_title = asset.safe_title();
        Self {
            title: asset.title().to_string(),
            dir: root.join(&safe_title),
            safe_title,
        }
    }

    fn artifact_filename(&self, descriptor: &StreamDescriptor) -> String {
        artifact_filename(&self.safe_title, descriptor.kind, &descriptor.extension())
    }

    fn artifact_path(&self, descriptor: &StreamDescriptor) -> PathBuf {
        self.dir.join(self.artifact_filename(descriptor))
    }

    fn output_path(&self) -> PathBuf {
        self.dir.join(merged_filename(&self.safe_title))
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with the default selector and sequential fetch.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn StreamCatalog>,
        fetcher: RetryingFetcher,
        merge_stage: MergeStage,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            merge_stage,
            selector: StreamSelector::default(),
            mode: FetchMode::default(),
            sink,
        }
    }

    /// Replaces the stream selector.
    #[must_use]
    pub fn with_selector(mut self, selector: StreamSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Sets how the two streams are fetched.
    #[must_use]
    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Configured fetch mode.
    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.mode
    }

    /// Runs the pipeline on a spawned tokio task.
    #[must_use = "the handle yields the run's outcome"]
    pub fn spawn(self, request: PipelineRequest) -> JoinHandle<Result<PathBuf, PipelineFailure>> {
        tokio::spawn(async move { self.run(&request).await })
    }

    /// Runs the pipeline to its terminal outcome.
    ///
    /// Emits [`PipelineEvent::Finished`] exactly once before returning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineFailure`] naming the stage that failed and the
    /// component error that caused it.
    #[instrument(skip(self, request), fields(source = %request.source_id(), mode = %self.mode))]
    pub async fn run(&self, request: &PipelineRequest) -> Result<PathBuf, PipelineFailure> {
        let outcome = self.execute(request).await;
        self.transition(PipelineState::Done);

        match outcome {
            Ok((title, output)) => {
                info!(title = %title, path = %output.display(), "pipeline succeeded");
                self.sink.notify(PipelineEvent::Finished {
                    success: true,
                    message: format!("Downloaded \"{title}\" to {}", output.display()),
                });
                Ok(output)
            }
            Err(failure) => {
                warn!(stage = %failure.stage, error = %failure.cause, "pipeline failed");
                self.sink.notify(PipelineEvent::Finished {
                    success: false,
                    message: format!("Error: {failure}"),
                });
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
    ) -> Result<(String, PathBuf), PipelineFailure> {
        self.transition(PipelineState::SelectingStreams);
        let entry = self
            .catalog
            .resolve(request.source_id())
            .await
            .map_err(|e| PipelineFailure::new(Stage::Selection, e))?;
        let selected = self
            .selector
            .select(&entry.streams)
            .map_err(|e| PipelineFailure::new(Stage::Selection, e))?;

        let asset = Asset::new(entry.title, request.source_id());
        let layout = AssetLayout::new(&asset, request.output_root());
        tokio::fs::create_dir_all(&layout.dir).await.map_err(|e| {
            PipelineFailure::new(Stage::VideoFetch, StageError::io(&layout.dir, e))
        })?;
        debug!(dir = %layout.dir.display(), "asset directory ready");

        let (video_job, audio_job) = match self.mode {
            FetchMode::Sequential => {
                self.fetch_sequential(&layout, &selected.video, &selected.audio)
                    .await?
            }
            FetchMode::Parallel => {
                self.fetch_parallel(&layout, &selected.video, &selected.audio)
                    .await?
            }
        };

        self.transition(PipelineState::Merging);
        let merge_request = MergeRequest::from_jobs(&video_job, &audio_job, layout.output_path())
            .map_err(|e| PipelineFailure::new(Stage::Merge, e))?;
        let output = self
            .merge_stage
            .merge(&merge_request)
            .await
            .map_err(|e| PipelineFailure::new(Stage::Merge, e))?;

        Ok((layout.title, output))
    }

    async fn fetch_sequential(
        &self,
        layout: &AssetLayout,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
    ) -> Result<(FetchJob, FetchJob), PipelineFailure> {
        self.transition(PipelineState::FetchingVideo);
        let video_job = self
            .fetch_stream(layout, video)
            .await
            .map_err(|e| PipelineFailure::new(Stage::VideoFetch, e))?;

        self.transition(PipelineState::FetchingAudio);
        let audio_job = self
            .fetch_stream(layout, audio)
            .await
            .map_err(|e| PipelineFailure::new(Stage::AudioFetch, e))?;

        Ok((video_job, audio_job))
    }

    async fn fetch_parallel(
        &self,
        layout: &AssetLayout,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
    ) -> Result<(FetchJob, FetchJob), PipelineFailure> {
        self.transition(PipelineState::FetchingStreams);

        let video_done = AtomicBool::new(false);
        let audio_done = AtomicBool::new(false);
        let video_fetch = async {
            let job = self
                .fetch_stream(layout, video)
                .await
                .map_err(|e| PipelineFailure::new(Stage::VideoFetch, e))?;
            video_done.store(true, Ordering::SeqCst);
            Ok::<_, PipelineFailure>(job)
        };
        let audio_fetch = async {
            let job = self
                .fetch_stream(layout, audio)
                .await
                .map_err(|e| PipelineFailure::new(Stage::AudioFetch, e))?;
            audio_done.store(true, Ordering::SeqCst);
            Ok::<_, PipelineFailure>(job)
        };

        match tokio::try_join!(video_fetch, audio_fetch) {
            Ok(jobs) => Ok(jobs),
            Err(failure) => {
                // The surviving fetch was dropped mid-transfer; discard its partial file.
                let (survivor, done) = if failure.stage == Stage::VideoFetch {
                    (audio, &audio_done)
                } else {
                    (video, &video_done)
                };
                if !done.load(Ordering::SeqCst) {
                    let path = layout.artifact_path(survivor);
                    if tokio::fs::remove_file(&path).await.is_ok() {
                        debug!(path = %path.display(), "removed partial artifact of cancelled fetch");
                    }
                }
                Err(failure)
            }
        }
    }

    async fn fetch_stream(
        &self,
        layout: &AssetLayout,
        descriptor: &StreamDescriptor,
    ) -> Result<FetchJob, FetchError> {
        self.fetcher
            .fetch(
                descriptor,
                &layout.dir,
                &layout.artifact_filename(descriptor),
                &layout.title,
                self.sink.as_ref(),
            )
            .await
    }

    fn transition(&self, state: PipelineState) {
        debug!(%state, "pipeline state changed");
        self.sink.notify(PipelineEvent::StateChanged { state });
    }
}
