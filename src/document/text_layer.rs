//! Text layer extraction
//!
//! Builds the selectable-text overlay for one page: word bounding boxes
//! from the bbox extractor, grouped into lines by vertical position and
//! flattened into compact `[x, y, w, h, text]` tuples.
//!
//! Results are recomputed on every call.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::local_cache::LocalCache;
use super::metadata::MetadataExtractor;
use super::tools::PdfTools;
use super::types::{round2, TextLayer, Word, WordTuple};
use super::{DocumentError, DocumentResult};

/// Words whose y differs from a line's y by at most this many points join that line
pub const LINE_TOLERANCE: f64 = 2.0;

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<word\b([^>]*)>(.*?)</word>").expect("valid regex"))
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"([A-Za-z]+)\s*=\s*"([^"]*)""#).expect("valid regex"))
}

/// Parse `<word xMin=".." yMin=".." xMax=".." yMax="..">text</word>` tags.
///
/// Attribute order does not matter. A word tag missing a coordinate is a
/// tool failure.
pub fn parse_word_boxes(markup: &str) -> DocumentResult<Vec<Word>> {
    word_pattern()
        .captures_iter(markup)
        .map(|caps| {
            let attrs = &caps[1];
            let (mut x_min, mut y_min, mut x_max, mut y_max) = (None, None, None, None);
            for attr in attribute_pattern().captures_iter(attrs) {
                let value = attr[2].parse::<f64>().ok();
                match &attr[1] {
                    "xMin" => x_min = value,
                    "yMin" => y_min = value,
                    "xMax" => x_max = value,
                    "yMax" => y_max = value,
                    _ => {}
                }
            }

            match (x_min, y_min, x_max, y_max) {
                (Some(x_min), Some(y_min), Some(x_max), Some(y_max)) => Ok(Word {
                    x: round2(x_min),
                    y: round2(y_min),
                    width: round2(x_max - x_min),
                    height: round2(y_max - y_min),
                    text: html_escape::decode_html_entities(&caps[2]).into_owned(),
                }),
                _ => Err(DocumentError::ExternalTool(format!(
                    "word tag with incomplete coordinates: {}",
                    attrs.trim()
                ))),
            }
        })
        .collect()
}

/// Group words into lines and order each line left to right.
///
/// Each word joins the first existing line whose y is within
/// [`LINE_TOLERANCE`] of the word's y, otherwise it starts a new line at
/// its own y. Linear in the number of lines per word.
pub fn merge_lines(words: Vec<Word>) -> Vec<Vec<Word>> {
    struct Line {
        y: f64,
        words: Vec<Word>,
    }

    let mut lines: Vec<Line> = Vec::new();
    for word in words {
        match lines
            .iter_mut()
            .find(|line| (line.y - word.y).abs() <= LINE_TOLERANCE)
        {
            Some(line) => line.words.push(word),
            None => lines.push(Line {
                y: word.y,
                words: vec![word],
            }),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.words.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.words
        })
        .collect()
}

/// Flatten merged lines into compact tuples, in line order
pub fn flatten_lines(lines: Vec<Vec<Word>>) -> Vec<WordTuple> {
    lines.into_iter().flatten().map(WordTuple::from).collect()
}

#[derive(Clone)]
pub struct TextLayerExtractor {
    cache: LocalCache,
    tools: Arc<dyn PdfTools>,
    metadata: MetadataExtractor,
}

impl TextLayerExtractor {
    pub fn new(cache: LocalCache, tools: Arc<dyn PdfTools>, metadata: MetadataExtractor) -> Self {
        Self {
            cache,
            tools,
            metadata,
        }
    }

    /// Word overlay for one page, sized with the page-1 dimensions
    pub async fn page_text(&self, id: &str, page: u32) -> DocumentResult<TextLayer> {
        if page == 0 {
            return Err(DocumentError::InvalidInput("Page numbers start at 1".to_string()));
        }

        let path = self.cache.ensure_local(id).await?;
        let meta = self.metadata.metadata(id).await?;
        if page > meta.total_pages {
            return Err(DocumentError::InvalidInput(format!(
                "Page {} is out of range (document has {} pages)",
                page, meta.total_pages
            )));
        }

        let markup = self.tools.word_boxes(&path, page).await?;
        let words = parse_word_boxes(&markup)?;
        let word_count = words.len();
        let words = flatten_lines(merge_lines(words));

        tracing::debug!(doc_id = %id, page = page, words = word_count, "Extracted text layer");

        Ok(TextLayer {
            width: meta.dimensions.width,
            height: meta.dimensions.height,
            words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x: f64, y: f64, text: &str) -> Word {
        Word {
            x,
            y,
            width: 10.0,
            height: 12.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_word_boxes() {
        let markup = r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="72.000000" yMin="71.557000" xMax="104.344000" yMax="83.520000">Hello</word>
    <word yMax="83.520000" xMax="140.123456" yMin="71.557000" xMin="107.331000">Tom&amp;Jerry</word>
  </page>
</doc>
</body>
</html>"#;

        let words = parse_word_boxes(markup).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].x, 72.0);
        assert_eq!(words[0].y, 71.56);
        assert_eq!(words[0].width, 32.34);
        assert_eq!(words[0].height, 11.96);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[1].x, 107.33);
        assert_eq!(words[1].width, 32.79);
        assert_eq!(words[1].text, "Tom&Jerry");
    }

    #[test]
    fn test_parse_empty_page() {
        let markup = r#"<page width="612" height="792"></page>"#;
        assert!(parse_word_boxes(markup).unwrap().is_empty());
    }

    #[test]
    fn test_parse_incomplete_word_is_tool_failure() {
        let markup = r#"<word xMin="1" yMin="2" xMax="3">x</word>"#;
        assert!(matches!(
            parse_word_boxes(markup),
            Err(DocumentError::ExternalTool(_))
        ));
    }

    #[test]
    fn test_merge_within_tolerance() {
        let lines = merge_lines(vec![
            word(50.0, 100.0, "world"),
            word(10.0, 101.5, "hello"),
            word(10.0, 105.0, "next"),
        ]);

        assert_eq!(lines.len(), 2);
        let first: Vec<&str> = lines[0].iter().map(|w| w.text.as_str()).collect();
        assert_eq!(first, vec!["hello", "world"]);
        assert_eq!(lines[1][0].text, "next");
    }

    #[test]
    fn test_line_keeps_first_word_y() {
        // 103.0 is within 2pt of 101.5 but not of the line's y (100.0)
        let lines = merge_lines(vec![
            word(0.0, 100.0, "a"),
            word(5.0, 101.5, "b"),
            word(9.0, 103.0, "c"),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1][0].text, "c");
    }

    #[test]
    fn test_flatten_preserves_line_order() {
        let lines = merge_lines(vec![
            word(30.0, 200.0, "second-b"),
            word(10.0, 100.0, "first"),
            word(10.0, 200.5, "second-a"),
        ]);
        let tuples = flatten_lines(lines);
        let texts: Vec<&str> = tuples.iter().map(|t| t.4.as_str()).collect();
        assert_eq!(texts, vec!["second-a", "second-b", "first"]);
    }
}
