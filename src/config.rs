//! Configuration types for scan-to-text conversion.
//!
//! All conversion behaviour is controlled through [`OcrConfig`], built via
//! its [`OcrConfigBuilder`]. The defaults reproduce the classic pipeline:
//! 300 DPI rasterisation, grayscale + adaptive Gaussian binarisation with a
//! 17 px block and an offset of 32, English Tesseract, English spell
//! correction, pages concatenated without delimiters.

use crate::error::OcrError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a scan-to-text conversion.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_ocr2txt::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .dpi(300)
///     .language("eng")
///     .jobs(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.threshold.block_size, 17);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for glyphs roughly 20–30 px tall; 300 DPI puts
    /// body text of a printed page in that band. Image inputs are used at
    /// their native resolution.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 10 000.
    ///
    /// A safety cap independent of DPI so an oversized page (posters,
    /// engineering drawings) cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Binarisation parameters applied uniformly to every page.
    pub threshold: ThresholdParams,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub language: String,

    /// Directory containing `*.traineddata`. If None, Tesseract uses
    /// `TESSDATA_PREFIX` or its compiled-in default.
    pub tessdata_dir: Option<PathBuf>,

    /// Run the spell corrector over recognised text. Default: true.
    pub spell_check: bool,

    /// Custom dictionary for the spell corrector. If None, the embedded
    /// English word-frequency list is used.
    pub dictionary: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Separator inserted between pages in the assembled text. Default: None.
    pub page_separator: PageSeparator,

    /// Number of pages recognised concurrently. Default: 1 (strictly sequential).
    ///
    /// Pages are independent, so raising this scales recognition across
    /// cores. Output order is always page order.
    pub jobs: usize,

    /// Optional progress callback; see [`crate::progress`].
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 10_000,
            threshold: ThresholdParams::default(),
            language: "eng".to_string(),
            tessdata_dir: None,
            spell_check: true,
            dictionary: None,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            jobs: 1,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("threshold", &self.threshold)
            .field("language", &self.language)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("spell_check", &self.spell_check)
            .field("dictionary", &self.dictionary)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("jobs", &self.jobs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn OcrProgressCallback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    /// Gaussian neighbourhood size in pixels. Must be odd and ≥ 3.
    pub fn block_size(mut self, block_size: u32) -> Self {
        self.config.threshold.block_size = block_size;
        self
    }

    /// Constant subtracted from the local mean before comparison.
    pub fn offset(mut self, offset: i32) -> Self {
        self.config.threshold.offset = offset;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn spell_check(mut self, v: bool) -> Self {
        self.config.spell_check = v;
        self
    }

    pub fn dictionary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dictionary = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn jobs(mut self, n: usize) -> Self {
        self.config.jobs = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(OcrError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        c.threshold.validate()?;
        if c.language.trim().is_empty() {
            return Err(OcrError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.jobs == 0 {
            return Err(OcrError::InvalidConfig("Jobs must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Binarisation parameters ──────────────────────────────────────────────

/// Parameters of the adaptive Gaussian threshold.
///
/// The defaults (block 17, offset 32) come from a comparison of
/// pre-processing methods on scanned documents where grayscale + Gaussian
/// binarisation gave the best Tesseract accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// Side of the square neighbourhood used for the local mean. Odd, ≥ 3.
    pub block_size: u32,
    /// Constant subtracted from the weighted mean.
    pub offset: i32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            block_size: 17,
            offset: 32,
        }
    }
}

impl ThresholdParams {
    /// Gaussian sigma matching a `block_size` kernel.
    ///
    /// Same derivation the common vision libraries use when only a kernel
    /// size is given: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    pub(crate) fn validate(&self) -> Result<(), OcrError> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(OcrError::InvalidConfig(format!(
                "Block size must be odd and ≥ 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of a PDF to convert. Ignored for image inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How to separate pages in the assembled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Pages are written back to back. (default)
    #[default]
    None,
    /// ASCII form feed, the traditional plain-text page break.
    FormFeed,
    /// A dashed rule on its own line.
    Rule,
    /// A rule carrying the number of the page that follows.
    PageNumber,
    /// Custom string placed on its own line between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => String::new(),
            PageSeparator::FormFeed => "\x0c".to_string(),
            PageSeparator::Rule => "\n----------------------------------------\n".to_string(),
            PageSeparator::PageNumber => format!("\n--- page {} ---\n", page_num),
            PageSeparator::Custom(s) => format!("\n{}\n", s),
        }
    }
}
