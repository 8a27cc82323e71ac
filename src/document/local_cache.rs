//! Local document cache
//!
//! Guarantees a document's bytes are on local disk, fetching them from the
//! origin at most once per identifier even under concurrent callers.
//!
//! A cached file is never revalidated or removed: once it exists at its
//! final path it is treated as permanently valid. Downloads are written to
//! a temporary sibling and renamed into place only when complete, so a
//! failed fetch never leaves a truncated file at the cache path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use super::inflight::InFlight;
use super::{DocumentError, DocumentResult};
use crate::lookup::ResourceLookup;

/// On-disk cache of original document bytes
#[derive(Clone)]
pub struct LocalCache {
    dir: PathBuf,
    client: reqwest::Client,
    lookup: Arc<dyn ResourceLookup>,
    downloads: InFlight<PathBuf>,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>, client: reqwest::Client, lookup: Arc<dyn ResourceLookup>) -> Self {
        Self {
            dir: dir.into(),
            client,
            lookup,
            downloads: InFlight::new(),
        }
    }

    /// Deterministic cache path for an identifier
    pub fn document_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", hashed_name(id)))
    }

    /// Make sure the document is on disk and return its path
    pub async fn ensure_local(&self, id: &str) -> DocumentResult<PathBuf> {
        let path = self.document_path(id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let lookup = Arc::clone(&self.lookup);
        let client = self.client.clone();
        let owned_id = id.to_string();
        self.downloads
            .run(id, move || download(lookup, client, owned_id, path))
            .await
    }

    /// Downloads currently in flight
    pub fn downloads_in_flight(&self) -> usize {
        self.downloads.len()
    }
}

async fn download(
    lookup: Arc<dyn ResourceLookup>,
    client: reqwest::Client,
    id: String,
    path: PathBuf,
) -> DocumentResult<PathBuf> {
    // A download that finished between the caller's check and registration
    if tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }

    let resource = lookup
        .lookup(&id)
        .await?
        .ok_or_else(|| DocumentError::NotFound(format!("Document '{}' not found", id)))?;
    let url = resource
        .url
        .ok_or_else(|| DocumentError::NotFound(format!("Document '{}' has no content", id)))?;

    tracing::info!(doc_id = %id, url = %url, "Fetching document from origin");

    let mut response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(DocumentError::Io(format!(
            "origin returned {} for document '{}'",
            response.status(),
            id
        )));
    }

    let part = temp_sibling(&path);
    let written = match write_body(&mut response, &part).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            tracing::warn!(doc_id = %id, error = %e, "Document download failed");
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, &path).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }

    tracing::info!(doc_id = %id, bytes = written, "Document cached");
    Ok(path)
}

async fn write_body(response: &mut reqwest::Response, part: &Path) -> DocumentResult<u64> {
    let mut file = tokio::fs::File::create(part).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// SHA-256 hex of an identifier, safe to use as a file name
pub(crate) fn hashed_name(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Unique temporary path next to `path`, renamed over it once complete
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.part", name, uuid::Uuid::new_v4()))
}
