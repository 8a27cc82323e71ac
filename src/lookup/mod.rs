//! Resource lookup
//!
//! Maps a document identifier to the origin URL its bytes are served from.
//! Two backends: an HTTP catalog service and a static JSON manifest.

mod http;
mod manifest;

use async_trait::async_trait;

use crate::document::DocumentResult;

pub use http::HttpLookup;
pub use manifest::ManifestLookup;

/// A known identifier. `url` is `None` when the resource has no content yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub url: Option<String>,
}

/// Identifier → origin URL resolution
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// `Ok(None)` when the identifier is unknown
    async fn lookup(&self, id: &str) -> DocumentResult<Option<Resource>>;
}
