//! Byte-level transport: one attempt at moving a stream to a local file.
//!
//! The [`Transport`] trait is the seam the fetcher retries over.
//! [`HttpTransport`] is the shipped implementation and streams a reqwest
//! response body to disk chunk by chunk, calling the progress callback after
//! every chunk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::media::StreamDescriptor;

/// Progress callback invoked with `(bytes_downloaded, bytes_total)`.
///
/// `bytes_total` is `0` when the size is unknown.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("avfetch/", env!("CARGO_PKG_VERSION"));

/// Downloads one stream descriptor to a local path.
///
/// Implementations must not leave a partial file at `destination` when they
/// return an error.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single download attempt and returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for any network, HTTP or filesystem failure.
    async fn download(
        &self,
        descriptor: &StreamDescriptor,
        destination: &Path,
        progress: &ProgressFn<'_>,
    ) -> Result<u64, DownloadError>;
}

/// HTTP transport with streaming bodies.
///
/// Create once and share; the inner client pools connections.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with the default timeouts (30 s connect, 300 s read).
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Builds a transport with explicit connect and read-idle timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_client(
            connect_timeout_secs,
            read_timeout_secs,
        )?))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Builds the shared reqwest client.
///
/// `read_timeout_secs` bounds each wait for data, not the whole transfer, so
/// a slow but steady stream never times out.
///
/// # Errors
///
/// Returns the reqwest builder error if the TLS backend cannot initialize.
pub fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, descriptor, progress), fields(kind = %descriptor.kind, url = %descriptor.url))]
    async fn download(
        &self,
        descriptor: &StreamDescriptor,
        destination: &Path,
        progress: &ProgressFn<'_>,
    ) -> Result<u64, DownloadError> {
        let url = parse_http_url(&descriptor.url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(&descriptor.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(&descriptor.url, status.as_u16()));
        }

        let advertised = response.content_length().filter(|len| *len > 0);
        let total = advertised.unwrap_or(descriptor.size_bytes);
        debug!(
            path = %destination.display(),
            total,
            advertised = advertised.is_some(),
            "response accepted, streaming body"
        );

        let file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        let written =
            match stream_to_file(file, response, &descriptor.url, destination, total, progress)
                .await
            {
                Ok(written) => written,
                Err(error) => {
                    remove_partial(destination).await;
                    return Err(error);
                }
            };

        if let Some(expected) = advertised
            && expected != written
        {
            remove_partial(destination).await;
            return Err(DownloadError::integrity(destination, expected, written));
        }

        info!(path = %destination.display(), bytes = written, "download complete");
        Ok(written)
    }
}

fn parse_http_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw).map_err(|_| DownloadError::invalid_url(raw))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(DownloadError::invalid_url(raw))
    }
}

async fn remove_partial(path: &Path) {
    debug!(path = %path.display(), "cleaning up partial file after error");
    let _ = tokio::fs::remove_file(path).await;
}

/// Streams the response body to `file`, reporting progress per chunk.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    total: u64,
    progress: &ProgressFn<'_>,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
        progress(bytes_written, total);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
