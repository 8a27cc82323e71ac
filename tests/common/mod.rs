//! Shared fixtures: a counting fake of the poppler tools and a throw-away
//! origin server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use tempfile::TempDir;

use docserve::config::{CacheConfig, Config, RenderConfig};
use docserve::document::{DocumentError, DocumentResult, DocumentService, PdfTools};
use docserve::lookup::ManifestLookup;
use docserve::state::AppState;

pub const REPORT: &str = "\
Title:           Fixture
Pages:           3
Encrypted:       no
Page    1 size:  612 x 792 pts (letter)
Page    1 rot:   0
";

pub const WORD_MARKUP: &str = r#"<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="120.000000" yMin="100.000000" xMax="150.000000" yMax="112.000000">world</word>
    <word xMin="72.000000" yMin="101.500000" xMax="110.000000" yMax="113.500000">Hello</word>
    <word xMin="72.000000" yMin="130.000000" xMax="100.000000" yMax="142.000000">Next</word>
  </page>
</doc>"#;

pub const PLAIN_TEXT: &str = "alpha beta\u{0C}Beta gamma\u{0C}delta\u{0C}";

/// Fake poppler tools that count every call
pub struct FakeTools {
    pub report: String,
    pub word_markup: String,
    pub text: String,
    /// How long a rasterization takes
    pub delay: Duration,
    pub fail_rasterize: bool,
    /// Report success without writing any raster file
    pub skip_output: bool,
    pub inspect_calls: AtomicUsize,
    pub rasterize_calls: AtomicUsize,
    pub word_box_calls: AtomicUsize,
    pub plain_text_calls: AtomicUsize,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            report: REPORT.to_string(),
            word_markup: WORD_MARKUP.to_string(),
            text: PLAIN_TEXT.to_string(),
            delay: Duration::from_millis(50),
            fail_rasterize: false,
            skip_output: false,
            inspect_calls: AtomicUsize::new(0),
            rasterize_calls: AtomicUsize::new(0),
            word_box_calls: AtomicUsize::new(0),
            plain_text_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeTools {
    pub fn rasterize_count(&self) -> usize {
        self.rasterize_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_count(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    pub fn plain_text_count(&self) -> usize {
        self.plain_text_calls.load(Ordering::SeqCst)
    }

    pub fn word_box_count(&self) -> usize {
        self.word_box_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfTools for FakeTools {
    async fn inspect(&self, _pdf: &Path, _first: u32, _last: u32) -> DocumentResult<String> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }

    async fn rasterize(&self, _pdf: &Path, _page: u32, dpi: u32, out_prefix: &Path) -> DocumentResult<()> {
        self.rasterize_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.fail_rasterize {
            return Err(DocumentError::ExternalTool("pdftoppm exited with status 1".to_string()));
        }
        if self.skip_output {
            return Ok(());
        }

        // Image side grows with density so different scales are distinguishable
        let side = (dpi / 16).max(1);
        let out = format!("{}.png", out_prefix.display());
        image::RgbImage::from_pixel(side, side, image::Rgb([250, 250, 250]))
            .save(&out)
            .map_err(DocumentError::from)
    }

    async fn word_boxes(&self, _pdf: &Path, _page: u32) -> DocumentResult<String> {
        self.word_box_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.word_markup.clone())
    }

    async fn plain_text(&self, _pdf: &Path) -> DocumentResult<String> {
        self.plain_text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

#[derive(Clone)]
struct OriginState {
    body: Arc<Vec<u8>>,
    hits: Arc<AtomicUsize>,
    delay: Duration,
}

/// Origin store bound to an ephemeral local port
pub struct Origin {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl Origin {
    /// Requests served so far, on any path
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_document(State(state): State<OriginState>) -> Vec<u8> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    state.body.as_ref().clone()
}

async fn serve_failure(State(state): State<OriginState>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

pub async fn spawn_origin(body: Vec<u8>, delay: Duration) -> Origin {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = OriginState {
        body: Arc::new(body),
        hits: Arc::clone(&hits),
        delay,
    };
    let app = Router::new()
        .route("/doc.pdf", get(serve_document))
        .route("/broken.pdf", get(serve_failure))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Origin {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// 1000 bytes with a recognisable pattern
pub fn document_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

/// A document service wired to fakes, caching under a temporary directory
pub struct Harness {
    pub dir: TempDir,
    pub tools: Arc<FakeTools>,
    pub origin: Origin,
    pub config: Config,
    pub service: DocumentService,
}

impl Harness {
    pub async fn new(tools: FakeTools) -> Self {
        Self::with_origin(tools, document_bytes(), Duration::from_millis(50)).await
    }

    pub async fn with_origin(tools: FakeTools, body: Vec<u8>, delay: Duration) -> Self {
        let dir = TempDir::new().unwrap();
        let origin = spawn_origin(body, delay).await;

        let mut entries = HashMap::new();
        entries.insert("doc".to_string(), Some(format!("{}/doc.pdf", origin.base_url)));
        entries.insert("broken".to_string(), Some(format!("{}/broken.pdf", origin.base_url)));
        entries.insert("draft".to_string(), None);
        let lookup = Arc::new(ManifestLookup::new(entries));

        let config = Config {
            cache: CacheConfig {
                dir: dir.path().to_path_buf(),
                metadata_entries: 16,
            },
            render: RenderConfig::default(),
            ..Config::default()
        };
        DocumentService::init_dirs(&config.cache).await.unwrap();

        let tools = Arc::new(tools);
        let service = DocumentService::new(
            &config.cache,
            config.render.clone(),
            reqwest::Client::new(),
            lookup,
            Arc::clone(&tools) as Arc<dyn PdfTools>,
        );

        Self {
            dir,
            tools,
            origin,
            config,
            service,
        }
    }

    pub fn router(&self) -> Router {
        docserve::app(AppState::new(self.service.clone()))
    }
}
