//! Push-based progress notifications from the pipeline to its caller.
//!
//! Events are fire-and-forget: a sink must never block the transport, and a
//! sink whose consumer has gone away silently drops events.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::media::StreamKind;
use crate::pipeline::PipelineState;

/// One progress update for an active fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchProgress {
    /// Stream being fetched.
    pub kind: StreamKind,
    /// Asset title for display.
    pub title: String,
    /// Bytes written so far in the current attempt.
    pub bytes_downloaded: u64,
    /// Total size in bytes; `0` when unknown.
    pub bytes_total: u64,
    /// Percentage in `[0, 100]`, never decreasing within one fetch.
    pub percent: f64,
}

impl FetchProgress {
    /// Whether the total size is known.
    #[must_use]
    pub fn size_known(&self) -> bool {
        self.bytes_total > 0
    }

    /// Human-readable status, e.g. `Downloading Video: Title (42.17%)`.
    #[must_use]
    pub fn status_line(&self) -> String {
        if self.size_known() {
            format!(
                "Downloading {}: {} ({:.2}%)",
                self.kind, self.title, self.percent
            )
        } else {
            format!(
                "Downloading {}: {} ({} bytes, size unknown)",
                self.kind, self.title, self.bytes_downloaded
            )
        }
    }
}

/// Notifications emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The orchestrator entered a new state.
    StateChanged {
        /// State just entered.
        state: PipelineState,
    },
    /// A transport progress callback fired.
    Progress(FetchProgress),
    /// An attempt failed and another one is scheduled.
    AttemptFailed {
        /// Stream being fetched.
        kind: StreamKind,
        /// The attempt that failed (1-indexed).
        attempt: u32,
        /// Attempt ceiling.
        max_attempts: u32,
        /// Display form of the transport error.
        error: String,
        /// Delay before the next attempt.
        retry_in: Duration,
    },
    /// The run reached its terminal outcome. Emitted exactly once.
    Finished {
        /// Whether the run produced a merged file.
        success: bool,
        /// Title on success, cause on failure.
        message: String,
    },
}

/// Receives pipeline events.
pub trait ProgressSink: Send + Sync {
    /// Delivers one event. Must not block.
    fn notify(&self, event: PipelineEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    fn notify(&self, event: PipelineEvent) {
        self(event);
    }
}

/// Sink backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, event: PipelineEvent) {
        // Receiver dropped: nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _event: PipelineEvent) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn progress(downloaded: u64, total: u64, percent: f64) -> FetchProgress {
        FetchProgress {
            kind: StreamKind::Video,
            title: "Clip".to_string(),
            bytes_downloaded: downloaded,
            bytes_total: total,
            percent,
        }
    }

    #[test]
    fn test_status_line_two_decimals() {
        let line = progress(4217, 10_000, 42.17).status_line();
        assert_eq!(line, "Downloading Video: Clip (42.17%)");
    }

    #[test]
    fn test_status_line_size_unknown() {
        let line = progress(512, 0, 0.0).status_line();
        assert_eq!(line, "Downloading Video: Clip (512 bytes, size unknown)");
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify(PipelineEvent::StateChanged {
            state: PipelineState::SelectingStreams,
        });
        sink.notify(PipelineEvent::Progress(progress(1, 2, 50.0)));

        assert_eq!(
            rx.recv().await.unwrap(),
            PipelineEvent::StateChanged {
                state: PipelineState::SelectingStreams
            }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            PipelineEvent::Progress(p) if p.bytes_downloaded == 1
        ));
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.notify(PipelineEvent::Finished {
            success: true,
            message: "done".to_string(),
        });
    }

    #[test]
    fn test_closure_is_a_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: PipelineEvent| seen.lock().unwrap().push(event);
        sink.notify(PipelineEvent::Progress(progress(0, 0, 0.0)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
