//! Input classification: decide the pipeline branch from the file extension.
//!
//! The extension is the whole contract. `.pdf` goes through the rasteriser,
//! `.png` / `.jpg` / `.jpeg` are decoded directly, anything else is rejected
//! before the filesystem is touched. Contents are never sniffed, so a PNG
//! renamed to `.pdf` fails later inside pdfium rather than here.

use crate::error::OcrError;
use crate::output::SourceKind;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A classified input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Multi-page document; each page is rasterised before OCR.
    Pdf(PathBuf),
    /// Single raster image; OCR runs on it directly.
    Image(PathBuf),
}

impl InputKind {
    /// Path of the input file regardless of its kind.
    pub fn path(&self) -> &Path {
        match self {
            InputKind::Pdf(p) | InputKind::Image(p) => p,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            InputKind::Pdf(_) => SourceKind::Pdf,
            InputKind::Image(_) => SourceKind::Image,
        }
    }
}

/// Classify a path by its (case-insensitive) extension.
pub fn classify(path: impl AsRef<Path>) -> Result<InputKind, OcrError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => Ok(InputKind::Pdf(path.to_path_buf())),
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => Ok(InputKind::Image(path.to_path_buf())),
        _ => Err(OcrError::UnsupportedFileType {
            path: path.to_path_buf(),
        }),
    }
}

/// Classify the input, then check it exists and is readable.
pub fn resolve(path: impl AsRef<Path>) -> Result<InputKind, OcrError> {
    let kind = classify(path)?;
    let path = kind.path();

    match std::fs::File::open(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(OcrError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved {:?} input: {}", kind.source_kind(), path.display());
    Ok(kind)
}

/// Decode an image input into memory.
pub fn load_image(path: &Path) -> Result<DynamicImage, OcrError> {
    image::open(path).map_err(|source| OcrError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}
