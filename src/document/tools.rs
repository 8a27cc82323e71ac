//! External PDF tools
//!
//! All poppler invocations go through the [`PdfTools`] trait so the
//! components can be driven by a fake in tests. [`PopplerTools`] runs the
//! real binaries as subprocesses; only the calling task waits on them.
//!
//! ## Requirements
//!
//! - `pdfinfo`, `pdftoppm` and `pdftotext` (poppler-utils) installed,
//!   either on `PATH` or at the configured locations

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{DocumentError, DocumentResult};
use crate::config::ToolsConfig;

/// Seam over the document inspection, rasterization and text tools
#[async_trait]
pub trait PdfTools: Send + Sync {
    /// Textual inspection report for pages `first..=last`
    async fn inspect(&self, pdf: &Path, first: u32, last: u32) -> DocumentResult<String>;

    /// Rasterize `page` at `dpi` into a PNG whose name starts with `out_prefix`.
    ///
    /// The exact file name is tool-dependent; callers probe for it.
    async fn rasterize(&self, pdf: &Path, page: u32, dpi: u32, out_prefix: &Path) -> DocumentResult<()>;

    /// Word bounding-box markup for a single page
    async fn word_boxes(&self, pdf: &Path, page: u32) -> DocumentResult<String>;

    /// Plain text of the whole document, pages separated by form feeds
    async fn plain_text(&self, pdf: &Path) -> DocumentResult<String>;
}

/// Poppler command-line tools
#[derive(Debug, Clone)]
pub struct PopplerTools {
    config: ToolsConfig,
}

impl PopplerTools {
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PdfTools for PopplerTools {
    async fn inspect(&self, pdf: &Path, first: u32, last: u32) -> DocumentResult<String> {
        let first = first.to_string();
        let last = last.to_string();
        let args: [&OsStr; 5] = [
            OsStr::new("-f"),
            OsStr::new(&first),
            OsStr::new("-l"),
            OsStr::new(&last),
            pdf.as_os_str(),
        ];
        run_tool(&self.config.pdfinfo, &args).await
    }

    async fn rasterize(&self, pdf: &Path, page: u32, dpi: u32, out_prefix: &Path) -> DocumentResult<()> {
        let page = page.to_string();
        let dpi = dpi.to_string();
        let args: [&OsStr; 10] = [
            OsStr::new("-png"),
            OsStr::new("-singlefile"),
            OsStr::new("-r"),
            OsStr::new(&dpi),
            OsStr::new("-f"),
            OsStr::new(&page),
            OsStr::new("-l"),
            OsStr::new(&page),
            pdf.as_os_str(),
            out_prefix.as_os_str(),
        ];
        run_tool(&self.config.pdftoppm, &args).await.map(|_| ())
    }

    async fn word_boxes(&self, pdf: &Path, page: u32) -> DocumentResult<String> {
        let page = page.to_string();
        let args: [&OsStr; 7] = [
            OsStr::new("-bbox"),
            OsStr::new("-f"),
            OsStr::new(&page),
            OsStr::new("-l"),
            OsStr::new(&page),
            pdf.as_os_str(),
            OsStr::new("-"),
        ];
        run_tool(&self.config.pdftotext, &args).await
    }

    async fn plain_text(&self, pdf: &Path) -> DocumentResult<String> {
        let args: [&OsStr; 2] = [pdf.as_os_str(), OsStr::new("-")];
        run_tool(&self.config.pdftotext, &args).await
    }
}

/// Run a tool to completion and return its stdout
async fn run_tool(program: &str, args: &[&OsStr]) -> DocumentResult<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DocumentError::ExternalTool(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            program = %program,
            status = %output.status,
            stderr = %stderr.trim(),
            "External tool failed"
        );
        return Err(DocumentError::ExternalTool(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
