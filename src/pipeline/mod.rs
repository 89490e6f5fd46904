//! Pipeline stages for PDF/image-to-text OCR.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ recognize ──▶ correct ──▶ write
//! (ext)     (pdfium)   (threshold)    (tesseract)   (speller)   (.txt)
//! ```
//!
//! 1. [`input`]     — classify the path by extension; decode image inputs
//! 2. [`render`]    — rasterise selected PDF pages at the configured DPI;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`preprocess`] — grayscale + adaptive Gaussian threshold
//! 4. [`recognize`] — Tesseract text recognition, one handle per page task
//! 5. [`correct`]   — dictionary spell correction of the recognised text
//! 6. [`write`]     — truncating write of every page's text, in page order

pub mod correct;
pub mod input;
pub mod preprocess;
pub mod recognize;
pub mod render;
pub mod write;
