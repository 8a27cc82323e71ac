//! Full-text search
//!
//! Extracts the plain text of the whole document, splits it into pages on
//! the form-feed separator, and scans each page for case-insensitive,
//! non-overlapping occurrences of the query.

use std::sync::Arc;

use super::local_cache::LocalCache;
use super::tools::PdfTools;
use super::types::SearchHit;
use super::DocumentResult;

/// Page separator emitted by the plain-text extractor
pub const PAGE_SEPARATOR: char = '\u{0C}';
/// Characters of context kept on each side of a match
pub const SNIPPET_CONTEXT: usize = 20;
/// Most matches reported for a single page
pub const MAX_MATCHES_PER_PAGE: usize = 10;

/// Split extractor output into per-page text blocks.
///
/// The extractor terminates every page with a separator, so the empty
/// block after the final separator is not a page.
pub fn split_pages(text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = text.split(PAGE_SEPARATOR).collect();
    if pages.len() > 1 && pages.last().is_some_and(|last| last.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Snippets for each occurrence of `query` in `text`, at most `limit`
pub fn find_matches(text: &str, query: &str, limit: usize) -> Vec<String> {
    let haystack: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    let mut snippets = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() && snippets.len() < limit {
        let window = &haystack[start..start + needle.len()];
        if chars_eq_ignore_case(window, &needle) {
            let from = start.saturating_sub(SNIPPET_CONTEXT);
            let to = (start + needle.len() + SNIPPET_CONTEXT).min(haystack.len());
            let context: String = haystack[from..to].iter().collect();
            snippets.push(collapse_whitespace(&context));
            start += needle.len();
        } else {
            start += 1;
        }
    }
    snippets
}

fn chars_eq_ignore_case(a: &[char], b: &[char]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| x == y || x.to_lowercase().eq(y.to_lowercase()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Search every page of an extracted document
pub fn search_text(text: &str, query: &str) -> Vec<SearchHit> {
    split_pages(text)
        .into_iter()
        .enumerate()
        .flat_map(|(index, page_text)| {
            find_matches(page_text, query, MAX_MATCHES_PER_PAGE)
                .into_iter()
                .map(move |snippet| SearchHit {
                    page: index as u32 + 1,
                    snippet,
                })
        })
        .collect()
}

#[derive(Clone)]
pub struct DocumentSearch {
    cache: LocalCache,
    tools: Arc<dyn PdfTools>,
}

impl DocumentSearch {
    pub fn new(cache: LocalCache, tools: Arc<dyn PdfTools>) -> Self {
        Self { cache, tools }
    }

    /// All matches of `query`, page by page. Blank queries match nothing
    /// and never touch the document; any other query is matched as given,
    /// surrounding whitespace included.
    pub async fn search(&self, id: &str, query: &str) -> DocumentResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let path = self.cache.ensure_local(id).await?;
        let text = self.tools.plain_text(&path).await?;
        let hits = search_text(&text, query);

        tracing::debug!(doc_id = %id, query = %query, hits = hits.len(), "Searched document");
        Ok(hits)
    }
}
