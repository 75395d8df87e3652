//! Error types for stream catalog resolution.

use thiserror::Error;

/// Errors from resolving a source identifier into stream descriptors.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The source identifier is not an http(s) URL.
    #[error("invalid source identifier: {source_id}")]
    InvalidSource {
        /// The rejected identifier.
        source_id: String,
    },

    /// The catalog answered with a non-success status.
    #[error("HTTP {status} resolving {url}")]
    Http {
        /// Manifest URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure reaching the catalog.
    #[error("network error resolving {url}: {source}")]
    Network {
        /// Manifest URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The catalog did not answer in time.
    #[error("timeout resolving {url}")]
    Timeout {
        /// Manifest URL.
        url: String,
    },

    /// The manifest body could not be understood.
    #[error("malformed manifest at {url}: {reason}")]
    Malformed {
        /// Manifest URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The manifest listed no streams at all.
    #[error("no streams offered by {url}")]
    NoStreams {
        /// Manifest URL.
        url: String,
    },
}

impl ResolutionError {
    /// Creates an invalid source error.
    pub fn invalid_source(source_id: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_id: source_id.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Maps a reqwest error, promoting timeouts to [`ResolutionError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a malformed manifest error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a no-streams error.
    pub fn no_streams(url: impl Into<String>) -> Self {
        Self::NoStreams { url: url.into() }
    }
}
