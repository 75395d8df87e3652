//! Stream catalogs: turn a source identifier into a title and descriptors.
//!
//! - [`StreamCatalog`] - async trait the pipeline resolves through
//! - [`ManifestCatalog`] - fetches a JSON stream manifest over HTTP
//!
//! # Object Safety
//!
//! The trait uses `async_trait` so the orchestrator can hold an
//! `Arc<dyn StreamCatalog>`.

mod error;
mod manifest;

pub use error::ResolutionError;
pub use manifest::ManifestCatalog;

use async_trait::async_trait;

use crate::media::StreamDescriptor;

/// What a catalog knows about one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Display title of the asset.
    pub title: String,
    /// Every stream variant on offer, in catalog order.
    pub streams: Vec<StreamDescriptor>,
}

/// Resolves source identifiers into stream descriptors.
#[async_trait]
pub trait StreamCatalog: Send + Sync {
    /// Looks up `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when the source cannot be resolved.
    async fn resolve(&self, source_id: &str) -> Result<CatalogEntry, ResolutionError>;
}
