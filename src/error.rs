//! Error type for the edgequake-ocr2txt library.
//!
//! Unlike a page-tolerant converter, OCR runs here are fail-fast: the first
//! failing stage aborts the whole document and surfaces as an [`OcrError`].
//! There is no per-page error type and no partial output to recover.
//!
//! Stage failures keep the message raised by the underlying library
//! (pdfium, Tesseract, the `image` codecs) in their `detail` field so the
//! operator sees exactly what the engine reported.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-ocr2txt library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file extension is not one of pdf, png, jpg, jpeg.
    #[error("Filetype not supported: '{path}'\nTry with PDF, PNG, JPG, or JPEG to proceed.")]
    UnsupportedFileType { path: PathBuf },

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The image file could not be decoded.
    #[error("Failed to decode image '{path}': {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened fine but contains no pages.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// Tesseract could not be initialised for the requested language.
    #[error(
        "Failed to initialise Tesseract for language '{language}': {detail}\n\
Make sure the traineddata is installed (e.g. `apt install tesseract-ocr-eng`)\n\
or point --tessdata / TESSDATA_PREFIX at the directory that holds it."
    )]
    OcrInitFailed { language: String, detail: String },

    /// Tesseract failed while reading a page.
    #[error("Text recognition failed for page {page}: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    // ── Spell-correction errors ───────────────────────────────────────────
    /// A custom dictionary file could not be read.
    #[error("Failed to load dictionary '{path}': {source}")]
    DictionaryLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dictionary parsed but holds no usable words.
    #[error("Dictionary '{path}' contains no words")]
    EmptyDictionary { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF input needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the ocr2txt binary or in the working directory.\n\
  • Install it system-wide (prebuilt: https://github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_file_type_display() {
        let e = OcrError::UnsupportedFileType {
            path: PathBuf::from("scan.gif"),
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.gif"), "got: {msg}");
        assert!(msg.contains("PDF, PNG, JPG, or JPEG"), "got: {msg}");
    }

    #[test]
    fn rasterisation_failed_display() {
        let e = OcrError::RasterisationFailed {
            page: 3,
            detail: "PdfiumLibraryInternalError(Unknown)".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("PdfiumLibraryInternalError"));
    }

    #[test]
    fn ocr_init_failed_mentions_language() {
        let e = OcrError::OcrInitFailed {
            language: "eng".into(),
            detail: "TessInitError { code: -1 }".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'eng'"));
        assert!(msg.contains("TESSDATA_PREFIX"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = OcrError::OutputWriteFailed {
            path: PathBuf::from("result.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(e.to_string().contains("result.txt"));
        assert!(e.source().is_some());
    }

    #[test]
    fn page_out_of_range_display() {
        let e = OcrError::PageOutOfRange { page: 9, total: 4 };
        assert!(e.to_string().contains("4 pages"));
    }
}
