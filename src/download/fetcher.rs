//! Retrying fetch of a single stream.
//!
//! [`RetryingFetcher`] drives a [`Transport`] through the attempts allowed
//! by its [`RetryPolicy`], waiting the fixed delay between attempts, and
//! turns raw `(bytes_downloaded, bytes_total)` callbacks into
//! [`PipelineEvent::Progress`] notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info, instrument, warn};

use super::error::FetchError;
use super::retry::{RetryDecision, RetryPolicy};
use super::transport::Transport;
use crate::media::{StreamDescriptor, StreamKind};
use crate::progress::{FetchProgress, PipelineEvent, ProgressSink};

/// Percentages are tracked in hundredths of a percent.
const FULL_BASIS_POINTS: u32 = 10_000;

/// Lifecycle state of a [`FetchJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Created, no attempt started.
    Pending,
    /// An attempt is running or a retry is scheduled.
    InProgress,
    /// The artifact is complete on disk.
    Succeeded,
    /// Every attempt failed.
    Failed,
}

/// Snapshot of one stream download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    /// Descriptor being fetched.
    pub descriptor: StreamDescriptor,
    /// Local file the artifact is written to.
    pub destination_path: PathBuf,
    /// Total size in bytes; `0` while unknown.
    pub bytes_total: u64,
    /// Bytes written by the last attempt.
    pub bytes_downloaded: u64,
    /// Attempts started so far.
    pub attempt_count: u32,
    /// Current state.
    pub state: FetchState,
}

impl FetchJob {
    fn new(descriptor: StreamDescriptor, destination_path: PathBuf) -> Self {
        let bytes_total = descriptor.size_bytes;
        Self {
            descriptor,
            destination_path,
            bytes_total,
            bytes_downloaded: 0,
            attempt_count: 0,
            state: FetchState::Pending,
        }
    }

    /// Stream kind of the descriptor.
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        self.descriptor.kind
    }

    /// Whether the artifact is complete on disk.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.state == FetchState::Succeeded
    }
}

/// Converts transport callbacks into progress events for one fetch.
///
/// Keeps a high-water mark so the reported percentage never goes backwards,
/// including when a retry restarts the byte count at zero.
struct ProgressTracker<'a> {
    kind: StreamKind,
    title: &'a str,
    fallback_total: u64,
    high_water: AtomicU32,
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressTracker<'a> {
    fn new(
        kind: StreamKind,
        title: &'a str,
        fallback_total: u64,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            kind,
            title,
            fallback_total,
            high_water: AtomicU32::new(0),
            sink,
        }
    }

    fn observe(&self, bytes_downloaded: u64, bytes_total: u64) {
        let total = if bytes_total > 0 {
            bytes_total
        } else {
            self.fallback_total
        };
        let basis_points = basis_points(bytes_downloaded, total);
        let previous = self.high_water.fetch_max(basis_points, Ordering::Relaxed);
        self.emit(bytes_downloaded, total, previous.max(basis_points));
    }

    fn complete(&self, bytes: u64) {
        self.high_water.store(FULL_BASIS_POINTS, Ordering::Relaxed);
        self.emit(bytes, bytes, FULL_BASIS_POINTS);
    }

    fn emit(&self, bytes_downloaded: u64, bytes_total: u64, basis_points: u32) {
        self.sink.notify(PipelineEvent::Progress(FetchProgress {
            kind: self.kind,
            title: self.title.to_string(),
            bytes_downloaded,
            bytes_total,
            percent: f64::from(basis_points) / 100.0,
        }));
    }
}

/// `downloaded / total` in hundredths of a percent, rounded half up and
/// clamped to `[0, 10000]`.
///
/// An unknown (zero) total reports zero.
fn basis_points(downloaded: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let total = u128::from(total);
    let scaled =
        (u128::from(downloaded) * u128::from(FULL_BASIS_POINTS) * 2 + total) / (total * 2);
    let scaled = scaled.min(u128::from(FULL_BASIS_POINTS));
    u32::try_from(scaled).unwrap_or(FULL_BASIS_POINTS)
}

/// Fetches streams with a fixed-delay retry policy.
#[derive(Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RetryingFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingFetcher {
    /// Creates a fetcher over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Downloads `descriptor` to `destination_dir/filename`.
    ///
    /// Every progress callback from the transport is forwarded to `sink`
    /// without throttling. A failed attempt followed by another one first
    /// waits the policy delay; the final failure is not followed by a delay.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] carrying the last transport error once every
    /// attempt has failed.
    #[instrument(
        skip(self, descriptor, destination_dir, title, sink),
        fields(kind = %descriptor.kind, max_attempts = self.policy.max_attempts())
    )]
    pub async fn fetch(
        &self,
        descriptor: &StreamDescriptor,
        destination_dir: &Path,
        filename: &str,
        title: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchJob, FetchError> {
        let mut job = FetchJob::new(descriptor.clone(), destination_dir.join(filename));
        let tracker = ProgressTracker::new(descriptor.kind, title, descriptor.size_bytes, sink);
        let on_progress = |downloaded: u64, total: u64| tracker.observe(downloaded, total);

        job.state = FetchState::InProgress;
        let mut attempt = 1;
        loop {
            job.attempt_count = attempt;
            debug!(attempt, path = %job.destination_path.display(), "starting attempt");

            let error = match self
                .transport
                .download(descriptor, &job.destination_path, &on_progress)
                .await
            {
                Ok(bytes) => {
                    tracker.complete(bytes);
                    job.bytes_downloaded = bytes;
                    job.bytes_total = bytes;
                    job.state = FetchState::Succeeded;
                    info!(
                        attempts = attempt,
                        bytes,
                        path = %job.destination_path.display(),
                        "fetch succeeded"
                    );
                    return Ok(job);
                }
                Err(error) => error,
            };

            match self.policy.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis(),
                        "attempt failed, retrying"
                    );
                    sink.notify(PipelineEvent::AttemptFailed {
                        kind: descriptor.kind,
                        attempt,
                        max_attempts: self.policy.max_attempts(),
                        error: error.to_string(),
                        retry_in: delay,
                    });
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    job.state = FetchState::Failed;
                    warn!(attempts = attempt, %reason, error = %error, "fetch failed");
                    return Err(FetchError {
                        kind: descriptor.kind,
                        attempts: attempt,
                        destination: job.destination_path,
                        source: error,
                    });
                }
            }
        }
    }
}
