//! Constants for the download module (timeouts, retry defaults).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read-idle timeout: longest wait for the next body chunk (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default attempt ceiling per stream, including the first attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
