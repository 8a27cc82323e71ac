//! Metadata extraction
//!
//! Page count and page size come from the inspection tool's report for
//! page 1. The page-1 size is reported for the whole document, which is
//! wrong for documents with mixed page sizes.

use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

use super::local_cache::LocalCache;
use super::tools::PdfTools;
use super::types::{Dimensions, DocumentMetadata};
use super::{DocumentError, DocumentResult};

const DEFAULT_MEMO_ENTRIES: usize = 256;

fn pages_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^Pages:\s+(\d+)").expect("valid regex"))
}

fn page_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)page(?:\s+\d+)?\s+size:\s*([0-9]*\.?[0-9]+)\s*x\s*([0-9]*\.?[0-9]+)")
            .expect("valid regex")
    })
}

/// Parse page count and page size out of an inspection report
pub fn parse_inspection_report(report: &str) -> DocumentResult<DocumentMetadata> {
    let total_pages = pages_pattern()
        .captures(report)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .ok_or_else(|| {
            DocumentError::ExternalTool("inspection report has no page count".to_string())
        })?;

    let (width, height) = page_size_pattern()
        .captures(report)
        .and_then(|caps| {
            let width = caps[1].parse::<f64>().ok()?;
            let height = caps[2].parse::<f64>().ok()?;
            Some((width, height))
        })
        .ok_or_else(|| {
            DocumentError::ExternalTool("inspection report has no page size".to_string())
        })?;

    Ok(DocumentMetadata {
        total_pages,
        dimensions: Dimensions { width, height },
    })
}

/// Extracts and memoizes document metadata
#[derive(Clone)]
pub struct MetadataExtractor {
    cache: LocalCache,
    tools: Arc<dyn PdfTools>,
    memo: Arc<Mutex<LruCache<String, DocumentMetadata>>>,
}

impl MetadataExtractor {
    pub fn new(cache: LocalCache, tools: Arc<dyn PdfTools>, memo_entries: usize) -> Self {
        let size = NonZeroUsize::new(memo_entries)
            .or_else(|| NonZeroUsize::new(DEFAULT_MEMO_ENTRIES))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache,
            tools,
            memo: Arc::new(Mutex::new(LruCache::new(size))),
        }
    }

    /// Page count and page-1 dimensions for a document
    pub async fn metadata(&self, id: &str) -> DocumentResult<DocumentMetadata> {
        let path = self.cache.ensure_local(id).await?;

        let memoized = self.memo.lock().get(id).cloned();
        if let Some(meta) = memoized {
            return Ok(meta);
        }

        let report = self.tools.inspect(&path, 1, 1).await?;
        let meta = parse_inspection_report(&report)?;

        tracing::debug!(
            doc_id = %id,
            pages = meta.total_pages,
            width = meta.dimensions.width,
            height = meta.dimensions.height,
            "Extracted document metadata"
        );

        self.memo.lock().put(id.to_string(), meta.clone());
        Ok(meta)
    }
}
