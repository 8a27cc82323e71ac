//! Static manifest lookup
//!
//! A JSON object mapping identifier to origin URL, `null` for resources
//! that exist but have no content:
//!
//! ```json
//! { "report-2024": "https://files.example.com/report.pdf", "draft": null }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use super::{Resource, ResourceLookup};
use crate::document::{DocumentError, DocumentResult};

#[derive(Debug, Clone, Default)]
pub struct ManifestLookup {
    entries: HashMap<String, Option<String>>,
}

impl ManifestLookup {
    pub fn new(entries: HashMap<String, Option<String>>) -> Self {
        Self { entries }
    }

    /// Load a manifest from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let entries = serde_json::from_slice(&raw).map_err(|e| {
            DocumentError::InvalidInput(format!("Invalid manifest {}: {}", path.display(), e))
        })?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ResourceLookup for ManifestLookup {
    async fn lookup(&self, id: &str) -> DocumentResult<Option<Resource>> {
        Ok(self
            .entries
            .get(id)
            .map(|url| Resource { url: url.clone() }))
    }
}
