//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state, so every call here
//! runs inside `tokio::task::spawn_blocking` and binds its own `Pdfium`
//! instance. Pages are rendered at `dpi / 72` scale (PDF user space is
//! 72 units per inch), capped by `max_rendered_pixels` on either edge.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::output::{DocumentInfo, SourceKind};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bind to a pdfium shared library.
///
/// Resolution order:
/// 1. `PDFIUM_LIB_PATH` — explicit path to the library file
/// 2. the platform library name in the working directory
/// 3. the platform library name next to the running executable
/// 4. the system library search path
pub fn bind_pdfium() -> Result<Pdfium, OcrError> {
    if let Ok(lib) = std::env::var("PDFIUM_LIB_PATH") {
        if !lib.is_empty() {
            return Pdfium::bind_to_library(&lib)
                .map(Pdfium::new)
                .map_err(|e| OcrError::PdfiumBindingFailed(format!("{lib}: {e}")));
        }
    }

    let mut candidates = vec![Pdfium::pdfium_platform_library_name_at_path("./")];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(&dir));
    }

    for candidate in candidates.iter().filter(|c| c.exists()) {
        match Pdfium::bind_to_library(candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => warn!("Could not bind pdfium at {}: {}", candidate.display(), e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| OcrError::PdfiumBindingFailed(e.to_string()))
}

/// Open a PDF, translating pdfium's load errors into [`OcrError`].
fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, OcrError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                OcrError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                OcrError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            OcrError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Count the pages of a PDF without rendering anything.
pub async fn page_count(pdf_path: &Path, password: Option<&str>) -> Result<usize, OcrError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, pwd.as_deref())?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Page-count task panicked: {}", e)))?
}

/// Rasterise selected pages of a PDF into images.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples in page order.
pub async fn render_pages(
    pdf_path: &Path,
    config: &OcrConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, OcrError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref(), &indices)
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Render task panicked: {}", e)))?
}

/// Scale factor from PDF points to pixels at `dpi`.
pub(crate) fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, OcrError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering at {} DPI", total_pages, dpi);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale_for_dpi(dpi))
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| OcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| OcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx, image));
    }

    Ok(results)
}

/// Describe a PDF (page count and info dictionary) without rendering pages.
pub async fn extract_info(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, OcrError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_info_blocking(path, pwd.as_deref()))
        .await
        .map_err(|e| OcrError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_info_blocking(pdf_path: PathBuf, password: Option<&str>) -> Result<DocumentInfo, OcrError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, &pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentInfo {
        page_count: document.pages().len() as usize,
        kind: SourceKind::Pdf,
        width: None,
        height: None,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        path: pdf_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_for_300_dpi() {
        assert!((scale_for_dpi(300) - 4.1666665).abs() < 1e-5);
        assert!((scale_for_dpi(72) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_pdfium_path_is_a_binding_error() {
        // Only exercise the explicit-path branch; leave the process env as we found it.
        let previous = std::env::var("PDFIUM_LIB_PATH").ok();
        std::env::set_var("PDFIUM_LIB_PATH", "/definitely/not/libpdfium.so");
        let result = bind_pdfium();
        match previous {
            Some(v) => std::env::set_var("PDFIUM_LIB_PATH", v),
            None => std::env::remove_var("PDFIUM_LIB_PATH"),
        }
        assert!(matches!(result, Err(OcrError::PdfiumBindingFailed(_))));
    }
}
