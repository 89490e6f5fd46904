//! Eager (full-document) conversion entry points.
//!
//! This module waits for every page, then returns. It collects each
//! [`PageResult`] into memory and assembles the final text before
//! returning. Use [`crate::stream::convert_stream`] to receive pages one at
//! a time instead.
//!
//! Conversion is fail-fast: the first page that cannot be rasterised,
//! recognised or corrected aborts the document, and no output file is
//! created by [`convert_to_file`].

use crate::config::{OcrConfig, PageSelection, ThresholdParams};
use crate::error::OcrError;
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo, PageResult, SourceKind};
use crate::pipeline::correct::Speller;
use crate::pipeline::input::{self, InputKind};
use crate::pipeline::recognize::RecognizerSpec;
use crate::pipeline::{preprocess, render, write};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Run OCR over a PDF or image file and return the corrected text.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — path to a `.pdf`, `.png`, `.jpg` or `.jpeg` file
/// * `config` — conversion configuration
///
/// # Errors
/// Any failing stage aborts the conversion: unsupported extension, missing
/// file, undecodable image, corrupt or encrypted PDF, Tesseract
/// initialisation or recognition failure, unreadable dictionary.
pub async fn convert(
    input: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<ConversionOutput, OcrError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    info!("Running OCR on {}...", input.display());

    // ── Step 1-3: Classify, count and rasterise ──────────────────────────
    let prepared = prepare(input, config).await?;
    let selected = prepared.pages.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    // ── Step 4-6: Binarise, recognise, correct ───────────────────────────
    let job = Arc::new(PageJob::new(config, prepared.kind.source_kind())?);
    let ocr_start = Instant::now();
    let pages: Vec<PageResult> = page_results(
        prepared.pages,
        job,
        config.jobs,
        config.progress_callback.clone(),
    )
    .try_collect()
    .await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 7: Assemble ─────────────────────────────────────────────────
    let text = write::assemble_text(&pages, &config.page_separator);

    let stats = ConversionStats {
        total_pages: prepared.total_pages,
        processed_pages: pages.len(),
        corrected_words: pages.iter().map(|p| p.corrections).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms: prepared.render_duration_ms,
        ocr_duration_ms,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected);
    }

    info!(
        "COMPLETED OCR ON {} ({} pages, {} corrections, {}ms)",
        input.display(),
        stats.processed_pages,
        stats.corrected_words,
        stats.total_duration_ms
    );

    Ok(ConversionOutput { text, pages, stats })
}

/// Run OCR and write the text to `output_path`, replacing any existing file.
///
/// The path is used as given; see [`write::output_path`] to derive
/// `<name>.txt` from a bare name. Nothing is written if OCR fails.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<ConversionStats, OcrError> {
    let output = convert(input, config).await?;
    let path = output_path.as_ref();

    let bytes = write::write_pages(path, &output.pages, &config.page_separator).await?;
    info!("Wrote {} bytes to {}", bytes, path.display());

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<ConversionOutput, OcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Describe an input without running OCR.
///
/// Does not need Tesseract. PDF inputs still need pdfium.
pub async fn inspect(
    input: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, OcrError> {
    match input::resolve(input)? {
        InputKind::Pdf(path) => render::extract_info(&path, password).await,
        InputKind::Image(path) => {
            let (width, height) =
                image::image_dimensions(&path).map_err(|source| OcrError::ImageDecode {
                    path: path.clone(),
                    source,
                })?;
            Ok(DocumentInfo {
                path,
                kind: SourceKind::Image,
                page_count: 1,
                width: Some(width),
                height: Some(height),
                title: None,
                author: None,
                producer: None,
            })
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Decoded page images ready for recognition.
pub(crate) struct PreparedInput {
    pub kind: InputKind,
    /// Pages in the source document.
    pub total_pages: usize,
    /// `(page_index_0based, image)` for every selected page, in page order.
    pub pages: Vec<(usize, DynamicImage)>,
    pub render_duration_ms: u64,
}

/// Classify the input and produce one image per selected page.
pub(crate) async fn prepare(input: &Path, config: &OcrConfig) -> Result<PreparedInput, OcrError> {
    // ── Step 1: Classify input ───────────────────────────────────────────
    let kind = input::resolve(input)?;
    let render_start = Instant::now();

    let (total_pages, pages) = match &kind {
        InputKind::Pdf(path) => {
            // ── Step 2: Count and select pages ───────────────────────────
            let total = render::page_count(path, config.password.as_deref()).await?;
            if total == 0 {
                return Err(OcrError::EmptyDocument { path: path.clone() });
            }
            info!("PDF has {} pages", total);

            let indices = config.pages.to_indices(total);
            if indices.is_empty() {
                return Err(OcrError::PageOutOfRange {
                    page: first_requested_page(config),
                    total,
                });
            }
            debug!("Selected {} pages for OCR", indices.len());

            // ── Step 3: Rasterise ────────────────────────────────────────
            (total, render::render_pages(path, config, &indices).await?)
        }
        InputKind::Image(path) => {
            let path = path.clone();
            let image = tokio::task::spawn_blocking(move || input::load_image(&path))
                .await
                .map_err(|e| OcrError::Internal(format!("Image decode task panicked: {}", e)))??;
            debug!("Decoded image {}x{}", image.width(), image.height());
            (1, vec![(0, image)])
        }
    };

    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Prepared {} page image(s) in {}ms",
        pages.len(),
        render_duration_ms
    );

    Ok(PreparedInput {
        kind,
        total_pages,
        pages,
        render_duration_ms,
    })
}

/// Lowest page number named by the selection, for out-of-range reports.
fn first_requested_page(config: &OcrConfig) -> usize {
    match &config.pages {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

/// Which spell corrector a conversion uses.
#[derive(Clone)]
pub(crate) enum Corrector {
    Disabled,
    English,
    Custom(Arc<Speller>),
}

impl Corrector {
    pub(crate) fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        if !config.spell_check {
            return Ok(Corrector::Disabled);
        }
        match &config.dictionary {
            Some(path) => Ok(Corrector::Custom(Arc::new(Speller::from_file(path)?))),
            None => Ok(Corrector::English),
        }
    }

    fn speller(&self) -> Option<&Speller> {
        match self {
            Corrector::Disabled => None,
            Corrector::English => Some(Speller::english()),
            Corrector::Custom(s) => Some(&**s),
        }
    }
}

/// Everything a worker thread needs to turn one page image into text.
pub(crate) struct PageJob {
    recognizer: RecognizerSpec,
    threshold: ThresholdParams,
    corrector: Corrector,
}

impl PageJob {
    pub(crate) fn new(config: &OcrConfig, kind: SourceKind) -> Result<Self, OcrError> {
        // Rendered pages have a known DPI; image inputs carry their own.
        let resolution = match kind {
            SourceKind::Pdf => Some(config.dpi),
            SourceKind::Image => None,
        };
        Ok(Self {
            recognizer: RecognizerSpec {
                language: config.language.clone(),
                tessdata_dir: config.tessdata_dir.clone(),
                resolution,
            },
            threshold: config.threshold,
            corrector: Corrector::from_config(config)?,
        })
    }
}

/// Blocking per-page work driven by [`page_results`].
pub(crate) trait PageWork: Send + Sync + 'static {
    fn run(&self, page_num: usize, image: DynamicImage) -> Result<PageResult, OcrError>;
}

impl PageWork for PageJob {
    /// Binarise, recognise and correct one page.
    fn run(&self, page_num: usize, image: DynamicImage) -> Result<PageResult, OcrError> {
        let start = Instant::now();

        let binary = preprocess::binarize(&image, &self.threshold);
        drop(image);

        let raw_text = self
            .recognizer
            .with_recognizer(|recognizer| recognizer.recognize(&binary, page_num))?;

        let (text, corrections) = match self.corrector.speller() {
            Some(speller) => speller.correct_with_count(&raw_text),
            None => (raw_text.clone(), 0),
        };
        if corrections > 0 {
            debug!("Page {}: {} words corrected", page_num, corrections);
        }

        Ok(PageResult {
            page_num,
            raw_text,
            text,
            corrections,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Recognise pages with up to `jobs` in flight, yielding in page order.
pub(crate) fn page_results<W: PageWork>(
    pages: Vec<(usize, DynamicImage)>,
    job: Arc<W>,
    jobs: usize,
    callback: Option<ProgressCallback>,
) -> impl futures::Stream<Item = Result<PageResult, OcrError>> + Send + 'static {
    let total = pages.len();

    stream::iter(pages.into_iter().map(move |(idx, image)| {
        let job = Arc::clone(&job);
        let callback = callback.clone();
        async move {
            let page_num = idx + 1;
            if let Some(ref cb) = callback {
                cb.on_page_start(page_num, total);
            }

            let result = tokio::task::spawn_blocking(move || job.run(page_num, image))
                .await
                .map_err(|e| OcrError::Internal(format!("OCR task panicked: {}", e)))
                .and_then(|r| r);

            if let Some(ref cb) = callback {
                match &result {
                    Ok(page) => cb.on_page_complete(page_num, total, page.text.len()),
                    Err(e) => cb.on_page_error(page_num, total, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffered(jobs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::OcrProgressCallback;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn unsupported_input_fails_before_any_work() {
        let err = convert("scan.gif", &OcrConfig::default()).await.unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let err = convert("/definitely/not/here.png", &OcrConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn failed_conversion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.txt");
        let err = convert_to_file("/definitely/not/here.jpg", &out, &OcrConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::FileNotFound { .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn inspect_image_reports_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        GrayImage::from_pixel(40, 25, Luma([255])).save(&path).unwrap();

        let info = inspect(&path, None).await.unwrap();
        assert_eq!(info.kind, SourceKind::Image);
        assert_eq!(info.page_count, 1);
        assert_eq!((info.width, info.height), (Some(40), Some(25)));
    }

    #[tokio::test]
    async fn image_input_ignores_page_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpeg");
        image::RgbImage::from_pixel(8, 8, image::Rgb([200, 200, 200]))
            .save(&path)
            .unwrap();

        let config = OcrConfig::builder()
            .pages(PageSelection::Single(7))
            .build()
            .unwrap();
        let prepared = prepare(&path, &config).await.unwrap();
        assert_eq!(prepared.total_pages, 1);
        assert_eq!(prepared.pages.len(), 1);
        assert_eq!(prepared.pages[0].0, 0);
    }

    #[test]
    fn corrector_follows_config() {
        let off = OcrConfig::builder().spell_check(false).build().unwrap();
        assert!(matches!(Corrector::from_config(&off).unwrap(), Corrector::Disabled));

        let on = OcrConfig::default();
        assert!(matches!(Corrector::from_config(&on).unwrap(), Corrector::English));

        let missing = OcrConfig::builder()
            .dictionary("/definitely/not/words.txt")
            .build()
            .unwrap();
        assert!(matches!(
            Corrector::from_config(&missing),
            Err(OcrError::DictionaryLoad { .. })
        ));
    }

    /// Echoes the page number back; earlier pages take longer.
    struct SlowEarlyPages {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl SlowEarlyPages {
        fn new(fail_on: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_on,
            })
        }
    }

    impl PageWork for SlowEarlyPages {
        fn run(&self, page_num: usize, _image: DynamicImage) -> Result<PageResult, OcrError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(80u64.saturating_sub(15 * page_num as u64)));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on == Some(page_num) {
                return Err(OcrError::RecognitionFailed {
                    page: page_num,
                    detail: "smudged".to_string(),
                });
            }
            Ok(PageResult {
                page_num,
                raw_text: format!("page {page_num}"),
                text: format!("page {page_num}"),
                corrections: 0,
                duration_ms: 0,
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl OcrProgressCallback for Recorder {
        fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
            self.0.lock().unwrap().push(format!("ok {page_num}"));
        }
        fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("err {page_num}"));
        }
    }

    fn blank_pages(n: usize) -> Vec<(usize, DynamicImage)> {
        (0..n).map(|i| (i, DynamicImage::new_luma8(1, 1))).collect()
    }

    #[tokio::test]
    async fn parallel_pages_are_yielded_in_page_order() {
        let work = SlowEarlyPages::new(None);
        let pages: Vec<PageResult> = page_results(blank_pages(5), Arc::clone(&work), 3, None)
            .try_collect()
            .await
            .unwrap();

        let nums: Vec<usize> = pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3, 4, 5]);
        assert_eq!(pages[3].text, "page 4");

        let peak = work.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "pages never overlapped");
        assert!(peak <= 3, "{peak} pages in flight with jobs = 3");
    }

    #[tokio::test]
    async fn zero_jobs_runs_pages_one_at_a_time() {
        let work = SlowEarlyPages::new(None);
        let pages: Vec<PageResult> = page_results(blank_pages(3), Arc::clone(&work), 0, None)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(work.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_page_is_reported_in_order() {
        let work = SlowEarlyPages::new(Some(2));
        let recorder = Arc::new(Recorder::default());
        let callback: ProgressCallback = recorder.clone();

        let results: Vec<Result<PageResult, OcrError>> =
            page_results(blank_pages(3), work, 2, Some(callback)).collect().await;

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(OcrError::RecognitionFailed { page: 2, .. })));
        assert!(results[2].is_ok());

        let mut events = recorder.0.lock().unwrap().clone();
        events.sort();
        assert_eq!(events, vec!["err 2", "ok 1", "ok 3"]);
    }

    #[test]
    fn first_requested_page_for_errors() {
        let mut c = OcrConfig::default();
        assert_eq!(first_requested_page(&c), 0);
        c.pages = PageSelection::Set(vec![9, 4, 12]);
        assert_eq!(first_requested_page(&c), 4);
        c.pages = PageSelection::Range(20, 30);
        assert_eq!(first_requested_page(&c), 20);
    }
}
