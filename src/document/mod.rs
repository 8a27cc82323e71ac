//! Document rendering, caching and streaming
//!
//! Turns an opaque document identifier into page images, text layers,
//! search results and byte-range streams.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    DocumentService                      │
//! └─────────────────────────────────────────────────────────┘
//!      │            │             │            │         │
//!      ▼            ▼             ▼            ▼         ▼
//! ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌────────┐ ┌────────┐
//! │ Metadata │ │ Page     │ │ TextLayer │ │ Search │ │ Range  │
//! │ Extractor│ │Rasterizer│ │ Extractor │ │        │ │Streamer│
//! └──────────┘ └──────────┘ └───────────┘ └────────┘ └────────┘
//!      │            │             │            │         │
//!      └────────────┴──────┬──────┴────────────┴─────────┘
//!                          ▼
//!   ┌─────────────────────────────────────────────────────┐
//!   │                   LocalCache                        │
//!   │  (origin bytes on disk, one download per id)        │
//!   └─────────────────────────────────────────────────────┘
//! ```
//!
//! Downloads and renders are coalesced through [`InFlight`]: concurrent
//! identical requests share one execution and observe the same outcome.
//! External tools are reached through [`PdfTools`].

mod error;
mod inflight;
mod local_cache;
mod metadata;
mod rasterizer;
mod search;
mod stream;
mod text_layer;
mod tools;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Response},
};

pub use error::{DocumentError, DocumentResult};
pub use inflight::InFlight;
pub use local_cache::LocalCache;
pub use metadata::{parse_inspection_report, MetadataExtractor};
pub use rasterizer::{raster_candidates, PageRasterizer, RenderKey, PAGE_IMAGE_CONTENT_TYPE};
pub use search::{
    find_matches, search_text, split_pages, DocumentSearch, MAX_MATCHES_PER_PAGE, PAGE_SEPARATOR,
    SNIPPET_CONTEXT,
};
pub use stream::{resolve_range, ByteRange, RangeRequest, RangeStreamer, DOCUMENT_CONTENT_TYPE};
pub use text_layer::{flatten_lines, merge_lines, parse_word_boxes, TextLayerExtractor, LINE_TOLERANCE};
pub use tools::{PdfTools, PopplerTools};
pub use types::{
    clamp_scale, round2, Dimensions, DocumentMetadata, SearchHit, TextLayer, Word, WordTuple,
    MAX_SCALE, MIN_SCALE,
};

use crate::config::{CacheConfig, RenderConfig};
use crate::lookup::ResourceLookup;

/// Entry point bundling every document component over one shared cache
#[derive(Clone)]
pub struct DocumentService {
    cache: LocalCache,
    metadata: MetadataExtractor,
    rasterizer: PageRasterizer,
    text: TextLayerExtractor,
    search: DocumentSearch,
    streamer: RangeStreamer,
}

impl DocumentService {
    pub fn new(
        cache_config: &CacheConfig,
        render_config: RenderConfig,
        client: reqwest::Client,
        lookup: Arc<dyn ResourceLookup>,
        tools: Arc<dyn PdfTools>,
    ) -> Self {
        let cache = LocalCache::new(cache_config.documents_dir(), client, lookup);
        let metadata = MetadataExtractor::new(
            cache.clone(),
            Arc::clone(&tools),
            cache_config.metadata_entries,
        );
        let rasterizer = PageRasterizer::new(
            cache.clone(),
            Arc::clone(&tools),
            metadata.clone(),
            cache_config.renders_dir(),
            render_config,
        );
        let text = TextLayerExtractor::new(cache.clone(), Arc::clone(&tools), metadata.clone());
        let search = DocumentSearch::new(cache.clone(), tools);
        let streamer = RangeStreamer::new(cache.clone());

        Self {
            cache,
            metadata,
            rasterizer,
            text,
            search,
            streamer,
        }
    }

    /// Create the cache directories. Called once at startup.
    pub async fn init_dirs(cache_config: &CacheConfig) -> DocumentResult<()> {
        tokio::fs::create_dir_all(cache_config.documents_dir()).await?;
        tokio::fs::create_dir_all(cache_config.renders_dir()).await?;
        Ok(())
    }

    pub async fn ensure_local(&self, id: &str) -> DocumentResult<PathBuf> {
        self.cache.ensure_local(id).await
    }

    pub async fn metadata(&self, id: &str) -> DocumentResult<DocumentMetadata> {
        self.metadata.metadata(id).await
    }

    pub async fn page_image(&self, id: &str, page: u32, scale: f32) -> DocumentResult<PathBuf> {
        self.rasterizer.page_image(id, page, scale).await
    }

    pub async fn page_text(&self, id: &str, page: u32) -> DocumentResult<TextLayer> {
        self.text.page_text(id, page).await
    }

    pub async fn search(&self, id: &str, query: &str) -> DocumentResult<Vec<SearchHit>> {
        self.search.search(id, query).await
    }

    pub async fn stream(
        &self,
        id: &str,
        method: &Method,
        range: Option<&str>,
    ) -> DocumentResult<Response<Body>> {
        self.streamer.stream(id, method, range).await
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn rasterizer(&self) -> &PageRasterizer {
        &self.rasterizer
    }
}
