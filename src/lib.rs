//! # edgequake-ocr2txt
//!
//! Turn scanned PDFs and photographed pages into plain text with Tesseract.
//!
//! Scans rarely OCR well as they come: uneven lighting, paper tint and
//! bleed-through confuse the recogniser. Every page is therefore rasterised
//! at a fixed DPI, binarised with an adaptive Gaussian threshold, recognised
//! by Tesseract and finally spell-corrected against an English
//! word-frequency dictionary before being written out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input       classify by extension
//!  ├─ 2. Render      rasterise PDF pages via pdfium at 300 DPI (spawn_blocking)
//!  ├─ 3. Preprocess  grayscale + adaptive Gaussian threshold (block 17, offset 32)
//!  ├─ 4. Recognize   Tesseract, English
//!  ├─ 5. Correct     dictionary spell correction, casing preserved
//!  └─ 6. Write       <name>.txt, truncated, pages back to back
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr2txt::{convert, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::default();
//!     let output = convert("scan.pdf", &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("{} pages, {} words corrected",
//!         output.stats.processed_pages,
//!         output.stats.corrected_words);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2txt` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-ocr2txt = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! - Tesseract and Leptonica shared libraries plus `eng.traineddata`.
//! - The pdfium shared library for PDF inputs (see [`pipeline::render::bind_pdfium`]).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, PageSelection, PageSeparator, ThresholdParams};
pub use convert::{convert, convert_sync, convert_to_file, inspect};
pub use error::OcrError;
pub use output::{ConversionOutput, ConversionStats, DocumentInfo, PageResult, SourceKind};
pub use pipeline::correct::Speller;
pub use pipeline::write::output_path;
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
pub use stream::{convert_stream, PageStream};
