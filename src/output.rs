//! Result types returned by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text recognised on a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number (always 1 for image inputs).
    pub page_num: usize,
    /// Tesseract output before spell correction.
    pub raw_text: String,
    /// Spell-corrected text; equals `raw_text` when correction is disabled.
    pub text: String,
    /// Number of words the spell corrector replaced.
    pub corrections: usize,
    /// Wall-clock time spent binarising, recognising and correcting this page.
    pub duration_ms: u64,
}

/// Aggregate numbers for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document (1 for images).
    pub total_pages: usize,
    /// Pages actually recognised (after page selection).
    pub processed_pages: usize,
    /// Words replaced by the spell corrector across all pages.
    pub corrected_words: usize,
    pub total_duration_ms: u64,
    /// Time spent rasterising (PDF) or decoding (image) the input.
    pub render_duration_ms: u64,
    /// Time spent binarising, recognising and correcting all pages.
    pub ocr_duration_ms: u64,
}

/// Full result of a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Corrected text of every page, concatenated in page order.
    pub text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

/// Which pipeline branch an input takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
}

/// Lightweight description of an input file, produced without running OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub page_count: usize,
    /// Pixel dimensions; only known up front for image inputs.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
}
