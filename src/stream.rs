//! Streaming conversion API: emit pages as they are recognised.
//!
//! Long scans take minutes. [`convert_stream`] yields each [`PageResult`]
//! as soon as it is ready, so callers can show partial text, drive their
//! own progress display or write pages out incrementally.
//!
//! Pages always arrive in page order, even with `jobs > 1`: up to `jobs`
//! pages are recognised concurrently, but results are released in
//! sequence. The stream ends after the first error.

use crate::config::OcrConfig;
use crate::convert::{page_results, prepare, PageJob};
use crate::error::OcrError;
use crate::output::PageResult;
use futures::stream::StreamExt;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, OcrError>> + Send>>;

/// Run OCR over a PDF or image, streaming pages as they are ready.
///
/// # Returns
/// - `Ok(PageStream)` — a stream of `Result<PageResult, OcrError>` in page order
/// - `Err(OcrError)` — the input could not be classified, opened or rasterised
pub async fn convert_stream(
    input: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<PageStream, OcrError> {
    let input = input.as_ref();
    info!("Running OCR on {} (streaming)...", input.display());

    // ── Classify, count and rasterise ────────────────────────────────────
    let prepared = prepare(input, config).await?;
    let job = Arc::new(PageJob::new(config, prepared.kind.source_kind())?);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(prepared.pages.len());
    }

    // ── Build the stream ─────────────────────────────────────────────────
    let pages = page_results(
        prepared.pages,
        job,
        config.jobs,
        config.progress_callback.clone(),
    );

    // Stop at the first failure.
    let s = pages.scan(false, |failed, item| {
        let next = if *failed {
            None
        } else {
            *failed = item.is_err();
            Some(item)
        };
        futures::future::ready(next)
    });

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_input_is_rejected_up_front() {
        match convert_stream("notes.docx", &OcrConfig::default()).await {
            Err(OcrError::UnsupportedFileType { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("a .docx input must not produce a stream"),
        }
    }

    #[tokio::test]
    async fn undecodable_image_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"\x89PNG but truncated").unwrap();

        match convert_stream(&path, &OcrConfig::default()).await {
            Err(OcrError::ImageDecode { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("a broken image must not produce a stream"),
        }
    }
}
