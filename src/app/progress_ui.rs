//! Terminal progress rendering for a pipeline run.
//!
//! Consumes the pipeline event channel on its own task and draws one bar per
//! stream, so video and audio status lines never interleave.

use std::collections::HashMap;
use std::time::Duration;

use avfetch_core::media::StreamKind;
use avfetch_core::progress::{FetchProgress, PipelineEvent};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

/// The run's `Finished` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub success: bool,
    pub message: String,
}

/// Spawns the renderer. With `visible == false` events are drained silently.
///
/// The task ends when the run's `Finished` event arrives or the channel
/// closes, and yields that event's summary if one arrived.
pub(crate) fn spawn_progress_ui(
    mut events: UnboundedReceiver<PipelineEvent>,
    visible: bool,
) -> JoinHandle<Option<RunSummary>> {
    tokio::spawn(async move {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let mut ui = ProgressUi::new(MultiProgress::with_draw_target(target));

        let mut summary = None;
        while let Some(event) = events.recv().await {
            summary = ui.handle(event);
            if summary.is_some() {
                break;
            }
        }
        ui.finish();
        summary
    })
}

struct ProgressUi {
    multi: MultiProgress,
    status: ProgressBar,
    bars: HashMap<StreamKind, ProgressBar>,
}

impl ProgressUi {
    fn new(multi: MultiProgress) -> Self {
        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(100));
        Self {
            multi,
            status,
            bars: HashMap::new(),
        }
    }

    /// Applies one event. Returns the summary once the run has finished.
    fn handle(&mut self, event: PipelineEvent) -> Option<RunSummary> {
        match event {
            PipelineEvent::StateChanged { state } => {
                debug!(%state, "progress ui state");
                self.status.set_message(capitalize(&state.to_string()));
                None
            }
            PipelineEvent::Progress(progress) => {
                self.update_bar(&progress);
                None
            }
            PipelineEvent::AttemptFailed {
                kind,
                attempt,
                max_attempts,
                error,
                retry_in,
            } => {
                let _ = self.multi.println(format!(
                    "{kind} attempt {attempt}/{max_attempts} failed: {error} (retrying in {:.1}s)",
                    retry_in.as_secs_f64()
                ));
                None
            }
            PipelineEvent::Finished { success, message } => Some(RunSummary { success, message }),
        }
    }

    fn update_bar(&mut self, progress: &FetchProgress) {
        let bar = self.bar_for(progress.kind);
        if progress.size_known() {
            bar.set_length(progress.bytes_total);
            bar.set_position(progress.bytes_downloaded.min(progress.bytes_total));
        } else {
            bar.set_position(progress.bytes_downloaded);
        }
        bar.set_message(progress.status_line());
    }

    fn bar_for(&mut self, kind: StreamKind) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(kind).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(
                ProgressStyle::with_template("[{bar:30}] {bytes}/{total_bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        })
    }

    fn finish(self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        self.status.finish_and_clear();
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
