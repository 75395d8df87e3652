//! JSON manifest catalog.
//!
//! The source identifier is the manifest URL. The manifest looks like:
//!
//! ```json
//! { "title": "Clip",
//!   "streams": [
//!     { "kind": "video", "resolution": "720p", "mime_type": "video/mp4",
//!       "size_bytes": 1234, "url": "v720.mp4" },
//!     { "kind": "audio", "mime_type": "audio/webm", "url": "https://cdn/a.webm" } ] }
//! ```
//!
//! Relative stream URLs are resolved against the manifest URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{CatalogEntry, ResolutionError, StreamCatalog};
use crate::download::build_client;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::media::StreamDescriptor;

#[derive(Debug, Deserialize)]
struct Manifest {
    title: String,
    #[serde(default)]
    streams: Vec<StreamDescriptor>,
}

/// Catalog backed by JSON manifests served over HTTP.
#[derive(Debug, Clone)]
pub struct ManifestCatalog {
    client: Client,
}

impl ManifestCatalog {
    /// Creates a catalog with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_client(
            CONNECT_TIMEOUT_SECS,
            READ_TIMEOUT_SECS,
        )?))
    }

    /// Creates a catalog sharing an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamCatalog for ManifestCatalog {
    #[instrument(skip(self), fields(source = %source_id))]
    async fn resolve(&self, source_id: &str) -> Result<CatalogEntry, ResolutionError> {
        let base = parse_manifest_url(source_id)?;

        let response = self
            .client
            .get(base.clone())
            .send()
            .await
            .map_err(|e| ResolutionError::from_reqwest(source_id, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "manifest request rejected");
            return Err(ResolutionError::http(source_id, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ResolutionError::from_reqwest(source_id, e))?;
        let manifest: Manifest = serde_json::from_slice(&body)
            .map_err(|e| ResolutionError::malformed(source_id, e.to_string()))?;

        if manifest.streams.is_empty() {
            return Err(ResolutionError::no_streams(source_id));
        }

        let streams = manifest
            .streams
            .into_iter()
            .map(|stream| absolutize(&base, stream))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(title = %manifest.title, streams = streams.len(), "manifest resolved");
        Ok(CatalogEntry {
            title: manifest.title,
            streams,
        })
    }
}

fn parse_manifest_url(source_id: &str) -> Result<Url, ResolutionError> {
    let url = Url::parse(source_id.trim())
        .map_err(|_| ResolutionError::invalid_source(source_id))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(ResolutionError::invalid_source(source_id))
    }
}

fn absolutize(
    base: &Url,
    mut stream: StreamDescriptor,
) -> Result<StreamDescriptor, ResolutionError> {
    let resolved = base.join(&stream.url).map_err(|e| {
        ResolutionError::malformed(base.as_str(), format!("bad stream url {:?}: {e}", stream.url))
    })?;
    stream.url = resolved.into();
    Ok(stream)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::media::StreamKind;

    #[test]
    fn test_parse_manifest_url_rejects_non_http() {
        assert!(matches!(
            parse_manifest_url("ftp://host/m.json"),
            Err(ResolutionError::InvalidSource { .. })
        ));
        assert!(matches!(
            parse_manifest_url("just words"),
            Err(ResolutionError::InvalidSource { .. })
        ));
        assert!(parse_manifest_url(" https://host/m.json ").is_ok());
    }

    #[test]
    fn test_absolutize_relative_and_absolute_urls() {
        let base = Url::parse("https://host/media/clip/manifest.json").unwrap();
        let relative = StreamDescriptor::video("720p", "video/mp4", 1, "v720.mp4");
        let absolute = StreamDescriptor::audio("audio/webm", 1, "https://cdn/a.webm");

        assert_eq!(
            absolutize(&base, relative).unwrap().url,
            "https://host/media/clip/v720.mp4"
        );
        assert_eq!(absolutize(&base, absolute).unwrap().url, "https://cdn/a.webm");
    }

    #[test]
    fn test_manifest_deserializes_streams_in_order() {
        let json = r#"{"title":"Clip","streams":[
            {"kind":"video","resolution":"480p","mime_type":"video/mp4","size_bytes":10,"url":"a"},
            {"kind":"audio","mime_type":"audio/mp4","url":"b"}]}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.title, "Clip");
        assert_eq!(manifest.streams.len(), 2);
        assert_eq!(manifest.streams[1].kind, StreamKind::Audio);
    }
}
