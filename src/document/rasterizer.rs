//! Page rasterizer
//!
//! Renders one page at one scale into a cached WebP image. The cache key is
//! (identifier, page, scale rounded to 2 decimals), so logically identical
//! requests always land on the same file. Concurrent identical requests
//! share one rasterize + encode run.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use super::inflight::InFlight;
use super::local_cache::{hashed_name, temp_sibling, LocalCache};
use super::metadata::MetadataExtractor;
use super::tools::PdfTools;
use super::types::clamp_scale;
use super::{DocumentError, DocumentResult};
use crate::config::RenderConfig;

/// Content type of rendered pages
pub const PAGE_IMAGE_CONTENT_TYPE: &str = "image/webp";

/// Deterministic identity of one render artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub page: u32,
    /// Clamped scale in hundredths (1.0 → 100)
    pub scale_hundredths: u32,
    pub file_name: String,
}

impl RenderKey {
    /// Build the key for a request. Out-of-range scales are clamped, not rejected.
    pub fn new(id: &str, page: u32, scale: f32) -> DocumentResult<Self> {
        if page == 0 {
            return Err(DocumentError::InvalidInput("Page numbers start at 1".to_string()));
        }
        if !scale.is_finite() {
            return Err(DocumentError::InvalidInput(format!("Invalid scale: {}", scale)));
        }

        let scale_hundredths = (clamp_scale(scale) * 100.0).round() as u32;
        let file_name = format!("{}_p{}_s{}.webp", hashed_name(id), page, scale_hundredths);

        Ok(Self {
            page,
            scale_hundredths,
            file_name,
        })
    }

    /// The rounded scale this key renders at
    pub fn scale(&self) -> f32 {
        self.scale_hundredths as f32 / 100.0
    }

    /// Rasterization density for this key
    pub fn dpi(&self, render: &RenderConfig) -> u32 {
        ((render.base_dpi * self.scale() * render.oversample).round() as u32).max(1)
    }
}

/// Renders and caches page images
#[derive(Clone)]
pub struct PageRasterizer {
    cache: LocalCache,
    tools: Arc<dyn PdfTools>,
    metadata: MetadataExtractor,
    dir: PathBuf,
    render: RenderConfig,
    renders: InFlight<PathBuf>,
}

impl PageRasterizer {
    pub fn new(
        cache: LocalCache,
        tools: Arc<dyn PdfTools>,
        metadata: MetadataExtractor,
        dir: impl Into<PathBuf>,
        render: RenderConfig,
    ) -> Self {
        Self {
            cache,
            tools,
            metadata,
            dir: dir.into(),
            render,
            renders: InFlight::new(),
        }
    }

    /// Path of the cached image for (id, page, scale), rendering it if needed.
    /// Pages past the end of the document are rejected before any render.
    pub async fn page_image(&self, id: &str, page: u32, scale: f32) -> DocumentResult<PathBuf> {
        let key = RenderKey::new(id, page, scale)?;
        let out = self.dir.join(&key.file_name);
        if tokio::fs::try_exists(&out).await? {
            return Ok(out);
        }

        let meta = self.metadata.metadata(id).await?;
        if page > meta.total_pages {
            return Err(DocumentError::InvalidInput(format!(
                "Page {} is out of range (document has {} pages)",
                page, meta.total_pages
            )));
        }

        let job = RenderJob {
            cache: self.cache.clone(),
            tools: Arc::clone(&self.tools),
            dir: self.dir.clone(),
            id: id.to_string(),
            dpi: key.dpi(&self.render),
            key: key.clone(),
            out,
        };
        self.renders.run(&key.file_name, move || job.run()).await
    }

    /// Renders currently in flight
    pub fn renders_in_flight(&self) -> usize {
        self.renders.len()
    }
}

/// Everything one render needs, owned so it can run on its own task
struct RenderJob {
    cache: LocalCache,
    tools: Arc<dyn PdfTools>,
    dir: PathBuf,
    id: String,
    key: RenderKey,
    dpi: u32,
    out: PathBuf,
}

impl RenderJob {
    async fn run(self) -> DocumentResult<PathBuf> {
        if tokio::fs::try_exists(&self.out).await? {
            return Ok(self.out);
        }

        let pdf = self.cache.ensure_local(&self.id).await?;

        tracing::debug!(
            doc_id = %self.id,
            page = self.key.page,
            scale = self.key.scale(),
            dpi = self.dpi,
            "Rendering page"
        );

        let prefix = self.dir.join(format!(".raster-{}", uuid::Uuid::new_v4()));
        if let Err(e) = self
            .tools
            .rasterize(&pdf, self.key.page, self.dpi, &prefix)
            .await
        {
            remove_candidates(&prefix, self.key.page).await;
            return Err(e);
        }

        let raster = find_raster(&prefix, self.key.page).await.ok_or_else(|| {
            DocumentError::NotFound(format!(
                "Rasterizer produced no image for page {} of '{}'",
                self.key.page, self.id
            ))
        })?;

        let part = temp_sibling(&self.out);
        let encoded = {
            let raster = raster.clone();
            let part = part.clone();
            tokio::task::spawn_blocking(move || encode_webp(&raster, &part))
                .await
                .map_err(DocumentError::from)
                .and_then(|result| result)
        };

        // Best effort: the intermediate raster is never needed again
        let _ = tokio::fs::remove_file(&raster).await;

        if let Err(e) = encoded {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&part, &self.out).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }

        tracing::info!(
            doc_id = %self.id,
            page = self.key.page,
            scale = self.key.scale(),
            "Page rendered"
        );
        Ok(self.out)
    }
}

/// Plausible rasterizer output names for a prefix, most likely first
pub fn raster_candidates(prefix: &Path, page: u32) -> Vec<PathBuf> {
    let base = prefix.to_string_lossy();
    let mut candidates = vec![PathBuf::from(format!("{}.png", base))];
    candidates.push(PathBuf::from(format!("{}-{}.png", base, page)));
    for width in 2..=6 {
        candidates.push(PathBuf::from(format!("{}-{:0width$}.png", base, page, width = width)));
    }
    candidates.dedup();
    candidates
}

async fn find_raster(prefix: &Path, page: u32) -> Option<PathBuf> {
    for candidate in raster_candidates(prefix, page) {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

async fn remove_candidates(prefix: &Path, page: u32) {
    for candidate in raster_candidates(prefix, page) {
        let _ = tokio::fs::remove_file(&candidate).await;
    }
}

/// Re-encode a raster file as lossless WebP
fn encode_webp(src: &Path, dst: &Path) -> DocumentResult<()> {
    let decoded = image::open(src)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut writer = BufWriter::new(std::fs::File::create(dst)?);
    rgb.write_to(&mut writer, image::ImageFormat::WebP)?;
    writer.flush()?;
    Ok(())
}
