//! Text recognition: binarised page → UTF-8 text via Tesseract (`leptess`).
//!
//! Only the plain text is kept. Tesseract also produces word boxes and
//! confidences, but nothing downstream uses them.
//!
//! A `LepTess` handle owns native state and is not shared across threads.
//! Each blocking worker thread keeps one [`Recognizer`] and reuses it for
//! every page it handles (see [`RecognizerSpec::with_recognizer`]).

use crate::error::OcrError;
use image::GrayImage;
use leptess::LepTess;
use std::cell::RefCell;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A Tesseract instance bound to one language pack.
pub struct Recognizer {
    engine: LepTess,
    language: String,
    resolution: Option<i32>,
}

impl Recognizer {
    /// Initialise Tesseract for `language` (e.g. "eng").
    ///
    /// `tessdata_dir` overrides where `*.traineddata` files are looked up;
    /// `None` defers to `TESSDATA_PREFIX` / the compiled-in default.
    pub fn new(language: &str, tessdata_dir: Option<&Path>) -> Result<Self, OcrError> {
        let datapath = tessdata_dir.map(|p| p.to_string_lossy().into_owned());
        let engine = LepTess::new(datapath.as_deref(), language).map_err(|e| {
            OcrError::OcrInitFailed {
                language: language.to_string(),
                detail: e.to_string(),
            }
        })?;

        Ok(Self {
            engine,
            language: language.to_string(),
            resolution: None,
        })
    }

    /// Tell Tesseract the pixel density of the pages it will receive.
    ///
    /// PNG buffers carry no DPI, and without a hint Tesseract guesses and
    /// logs a warning per page. Rendered PDF pages know their DPI exactly.
    pub fn with_resolution(mut self, dpi: u32) -> Self {
        self.resolution = Some(dpi as i32);
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Recognise the text on one binarised page.
    pub fn recognize(&mut self, page: &GrayImage, page_num: usize) -> Result<String, OcrError> {
        let png = encode_png(page).map_err(|e| OcrError::RecognitionFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {}", e),
        })?;

        self.engine
            .set_image_from_mem(&png)
            .map_err(|e| OcrError::RecognitionFailed {
                page: page_num,
                detail: e.to_string(),
            })?;

        if let Some(dpi) = self.resolution {
            self.engine.set_source_resolution(dpi);
        }

        let text = self
            .engine
            .get_utf8_text()
            .map_err(|e| OcrError::RecognitionFailed {
                page: page_num,
                detail: e.to_string(),
            })?;

        debug!("Page {}: recognised {} chars", page_num, text.len());
        Ok(text)
    }
}

thread_local! {
    static THREAD_RECOGNIZER: RefCell<Option<(RecognizerSpec, Recognizer)>> =
        const { RefCell::new(None) };
}

/// Arguments needed to build a [`Recognizer`] on a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerSpec {
    pub language: String,
    pub tessdata_dir: Option<PathBuf>,
    pub resolution: Option<u32>,
}

impl RecognizerSpec {
    pub fn build(&self) -> Result<Recognizer, OcrError> {
        let recognizer = Recognizer::new(&self.language, self.tessdata_dir.as_deref())?;
        Ok(match self.resolution {
            Some(dpi) => recognizer.with_resolution(dpi),
            None => recognizer,
        })
    }

    /// Run `f` with this thread's recognizer.
    ///
    /// The Tesseract handle is initialised on the first call on a thread and
    /// kept for later pages. A call with a different spec replaces it.
    pub fn with_recognizer<T>(
        &self,
        f: impl FnOnce(&mut Recognizer) -> Result<T, OcrError>,
    ) -> Result<T, OcrError> {
        THREAD_RECOGNIZER.with(|cell| {
            let mut slot = cell.borrow_mut();
            let recognizer = reuse_or_build(&mut *slot, self, || {
                debug!("Initialising Tesseract ({}) on this worker", self.language);
                self.build()
            })?;
            f(recognizer)
        })
    }
}

/// Return the cached value when it was built for `key`, otherwise build and
/// cache a new one. A stale value is dropped before the new one is built.
fn reuse_or_build<'a, K, V, E>(
    slot: &'a mut Option<(K, V)>,
    key: &K,
    build: impl FnOnce() -> Result<V, E>,
) -> Result<&'a mut V, E>
where
    K: PartialEq + Clone,
{
    let entry = match slot.take().filter(|(cached, _)| cached == key) {
        Some(entry) => slot.insert(entry),
        None => slot.insert((key.clone(), build()?)),
    };
    Ok(&mut entry.1)
}

/// Losslessly encode a page for Tesseract's in-memory loader.
pub(crate) fn encode_png(page: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    page.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
