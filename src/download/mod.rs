//! Stream download: transport, retry policy and the retrying fetcher.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use avfetch_core::download::{HttpTransport, RetryPolicy, RetryingFetcher};
//! use avfetch_core::media::StreamDescriptor;
//! use avfetch_core::progress::NullSink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = RetryingFetcher::new(Arc::new(HttpTransport::new()?), RetryPolicy::default());
//! let descriptor = StreamDescriptor::audio("audio/webm", 0, "https://cdn.example.com/a.webm");
//! let job = fetcher
//!     .fetch(&descriptor, Path::new("./downloads"), "clip [Audio].webm", "clip", &NullSink)
//!     .await?;
//! println!("Downloaded: {}", job.destination_path.display());
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod fetcher;
mod retry;
mod transport;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, READ_TIMEOUT_SECS,
};
pub use error::{DownloadError, FetchError};
pub use fetcher::{FetchJob, FetchState, RetryingFetcher};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{HttpTransport, ProgressFn, Transport, USER_AGENT, build_client};

// No module-local Result aliases; spell out `Result<T, DownloadError>`.
