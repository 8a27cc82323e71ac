//! Document data types
//!
//! Wire shapes returned by the document components.

use serde::{Deserialize, Serialize};

/// Lowest accepted render scale
pub const MIN_SCALE: f32 = 0.1;
/// Highest accepted render scale
pub const MAX_SCALE: f32 = 4.0;

/// Page size in PDF points (72 points = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Document metadata taken from the inspection report
///
/// `dimensions` are those of page 1 and are reused for every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub total_pages: u32,
    pub dimensions: Dimensions,
}

/// A single word with its bounding box, as emitted by the bbox extractor
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
}

/// Compact word tuple `[x, y, w, h, text]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTuple(pub f64, pub f64, pub f64, pub f64, pub String);

impl From<Word> for WordTuple {
    fn from(word: Word) -> Self {
        WordTuple(word.x, word.y, word.width, word.height, word.text)
    }
}

/// Text overlay for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub width: f64,
    pub height: f64,
    pub words: Vec<WordTuple>,
}

/// One search occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub page: u32,
    #[serde(rename = "match")]
    pub snippet: String,
}

/// Clamp a requested scale into the accepted range
pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
