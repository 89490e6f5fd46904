//! CLI binary for edgequake-ocr2txt.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`,
//! sets up the `OCR.log` file logger and reports progress.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocr2txt::{
    convert_to_file, inspect, output_path, OcrConfig, OcrProgressCallback, PageSelection,
    PageSeparator, ProgressCallback, SourceKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, Event, Subscriber};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one line per recognised page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Start as a spinner; `on_conversion_start` switches to a bar.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rasterising pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        // Keep the first line only; the full error is reported on exit.
        let msg = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

// ── OCR.log formatting ───────────────────────────────────────────────────────

/// `2024-05-01 13:37:00,123 : INFO / message`
struct OcrLogFormat;

impl<S, N> FormatEvent<S, N> for OcrLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now();
        write!(
            writer,
            "{} : {} / ",
            now.format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the file logger and the stderr logger.
///
/// The log file is always created (append mode). Events reach it only when
/// verbose, and only from this crate.
fn init_logging(log_file: &Path, verbose: bool, stderr_default: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let file_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    let file_targets = Targets::new()
        .with_target("edgequake_ocr2txt", file_level)
        .with_target("ocr2txt", file_level);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .event_format(OcrLogFormat)
        .with_filter(file_targets);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(stderr_default)),
        );

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install logger")?;
    Ok(())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scan to text (writes result.txt)
  ocr2txt --input scan.pdf --output result --verbose False

  # Photograph of a page, detailed log in OCR.log
  ocr2txt --input page.jpg --output page --verbose True

  # First ten pages, form feed between pages, four pages at a time
  ocr2txt --input book.pdf --output book --verbose False --pages 1-10 --separator ff --jobs 4

  # Raw Tesseract output, no spell correction
  ocr2txt --input scan.png --output raw --verbose False --no-spellcheck

  # Page count and metadata only
  ocr2txt --input scan.pdf --inspect-only --json

ENVIRONMENT VARIABLES:
  OCR2TXT_*          Every option, e.g. OCR2TXT_DPI=400, OCR2TXT_LANG=eng
  TESSDATA_PREFIX    Directory holding eng.traineddata (see --tessdata)
  PDFIUM_LIB_PATH    Path to the pdfium shared library used for PDF input
  RUST_LOG           Filter for log lines printed to the terminal

LOGGING:
  OCR.log (see --log-file) is created in the working directory on every run
  and appended to. With --verbose True it records every step as
    2024-05-01 13:37:00,123 : INFO / Running OCR on scan.pdf...
"#;

/// Parse the historical `True` / `False` verbosity spellings.
fn parse_verbose(s: &str) -> Result<bool, String> {
    match s {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(format!(
            "'{other}' is not a valid verbosity; use True or False"
        )),
    }
}

/// Run Tesseract OCR over a scanned PDF or image and write spell-corrected text.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2txt",
    version,
    about = "Convert scanned PDFs and images to plain text with Tesseract OCR",
    long_about = "Convert a scanned PDF, PNG or JPEG into plain text. Pages are rasterised at \
300 DPI, binarised with an adaptive Gaussian threshold, recognised with Tesseract (English) \
and spell-corrected before being written to <OUTPUT>.txt.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file: .pdf, .png, .jpg or .jpeg.
    #[arg(short, long, env = "OCR2TXT_INPUT")]
    input: PathBuf,

    /// Output name; text is written to <OUTPUT>.txt.
    #[arg(short, long, env = "OCR2TXT_OUTPUT", required_unless_present = "inspect_only")]
    output: Option<PathBuf>,

    /// Record detailed logs in the log file: True or False. Required.
    #[arg(
        long,
        env = "OCR2TXT_VERBOSE",
        value_name = "True|False",
        num_args = 1,
        required_unless_present = "inspect_only",
        value_parser = parse_verbose
    )]
    verbose: Option<bool>,

    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "OCR2TXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s).
    #[arg(long = "lang", env = "OCR2TXT_LANG", default_value = "eng")]
    language: String,

    /// Directory containing *.traineddata.
    #[arg(long, env = "OCR2TXT_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Gaussian threshold neighbourhood in pixels (odd, ≥ 3).
    #[arg(long, env = "OCR2TXT_BLOCK_SIZE", default_value_t = 17)]
    block_size: u32,

    /// Constant subtracted from the local mean.
    #[arg(long, env = "OCR2TXT_OFFSET", default_value_t = 32, allow_negative_numbers = true)]
    offset: i32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "OCR2TXT_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, ff, hr, page, or a custom string.
    #[arg(long, env = "OCR2TXT_SEPARATOR", default_value = "none")]
    separator: String,

    /// Write Tesseract output as is, without spell correction.
    #[arg(long, env = "OCR2TXT_NO_SPELLCHECK")]
    no_spellcheck: bool,

    /// Custom dictionary: one `word` or `word count` per line.
    #[arg(long, env = "OCR2TXT_DICTIONARY")]
    dictionary: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR2TXT_PASSWORD")]
    password: Option<String>,

    /// Pages recognised concurrently.
    #[arg(short, long, env = "OCR2TXT_JOBS", default_value_t = 1)]
    jobs: usize,

    /// Log file, appended to on every run.
    #[arg(long, env = "OCR2TXT_LOG_FILE", default_value = "OCR.log")]
    log_file: PathBuf,

    /// Disable progress bar.
    #[arg(long, env = "OCR2TXT_NO_PROGRESS")]
    no_progress: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR2TXT_QUIET")]
    quiet: bool,

    /// Print page count and metadata only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// With --inspect-only, print JSON.
    #[arg(long, requires = "inspect_only")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let stderr_default = if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };
    init_logging(&cli.log_file, cli.verbose.unwrap_or(false), stderr_default)?;

    if let Err(e) = run(cli, show_progress).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect input")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.path.display());
            println!(
                "Kind:         {}",
                match info.kind {
                    SourceKind::Pdf => "PDF",
                    SourceKind::Image => "image",
                }
            );
            println!("Pages:        {}", info.page_count);
            if let (Some(w), Some(h)) = (info.width, info.height) {
                println!("Size:         {}x{} px", w, h);
            }
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn OcrProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // `required_unless_present` guarantees an output name here.
    let name = cli.output.as_deref().context("--output is required")?;
    let target = output_path(name);

    // ── Run OCR ──────────────────────────────────────────────────────────
    if !cli.quiet {
        eprintln!("{} Running OCR on {}...", cyan("◆"), bold(&cli.input.display().to_string()));
    }

    let stats = convert_to_file(&cli.input, &target, &config)
        .await
        .with_context(|| format!("OCR failed for {}", cli.input.display()))?;

    if !cli.quiet {
        println!(
            "{} Completed! {} written ({} pages)",
            green("✔"),
            bold(&target.display().to_string()),
            stats.processed_pages
        );
        println!(
            "   {}",
            dim(&format!(
                "{} words corrected  —  {}ms render  /  {}ms OCR  /  {}ms total",
                stats.corrected_words,
                stats.render_duration_ms,
                stats.ocr_duration_ms,
                stats.total_duration_ms
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let pages = parse_pages(&cli.pages)?;
    let separator = parse_separator(&cli.separator);

    let mut builder = OcrConfig::builder()
        .dpi(cli.dpi)
        .block_size(cli.block_size)
        .offset(cli.offset)
        .language(cli.language.clone())
        .spell_check(!cli.no_spellcheck)
        .pages(pages)
        .page_separator(separator)
        .jobs(cli.jobs);

    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref dict) = cli.dictionary {
        builder = builder.dictionary(dict.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" | "" => PageSeparator::None,
        "ff" | "formfeed" => PageSeparator::FormFeed,
        "hr" | "---" => PageSeparator::Rule,
        "page" => PageSeparator::PageNumber,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_accepts_only_python_booleans() {
        assert_eq!(parse_verbose("True"), Ok(true));
        assert_eq!(parse_verbose("False"), Ok(false));
        for bad in ["true", "FALSE", "1", "yes", ""] {
            assert!(parse_verbose(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn verbose_flag_forms() {
        let base = ["ocr2txt", "--input", "a.png", "--output", "out"];

        let cli = Cli::try_parse_from(base.iter().chain(&["--verbose", "True"])).unwrap();
        assert_eq!(cli.verbose, Some(true));

        let cli = Cli::try_parse_from(base.iter().chain(&["--verbose", "False"])).unwrap();
        assert_eq!(cli.verbose, Some(false));

        let err = Cli::try_parse_from(base.iter().chain(&["--verbose", "maybe"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn verbose_must_be_given_with_a_value() {
        let base = ["ocr2txt", "--input", "a.png", "--output", "out"];

        let err = Cli::try_parse_from(base).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("--verbose"));

        let err = Cli::try_parse_from(base.iter().chain(&["--verbose"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn output_required_unless_inspecting() {
        assert!(Cli::try_parse_from(["ocr2txt", "--input", "a.pdf", "--verbose", "False"]).is_err());
        let cli = Cli::try_parse_from(["ocr2txt", "--input", "a.pdf", "--inspect-only"]).unwrap();
        assert_eq!(cli.verbose, None);
    }

    #[test]
    fn pages_parsing() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" ALL ").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("5").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(
            parse_pages("1, 3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-2").is_err());
        assert!(parse_pages("1,x").is_err());
        assert!(parse_pages("abc").is_err());
    }

    #[test]
    fn separator_parsing() {
        assert_eq!(parse_separator("none"), PageSeparator::None);
        assert_eq!(parse_separator("FF"), PageSeparator::FormFeed);
        assert_eq!(parse_separator("hr"), PageSeparator::Rule);
        assert_eq!(parse_separator("page"), PageSeparator::PageNumber);
        assert_eq!(
            parse_separator("=== Next ==="),
            PageSeparator::Custom("=== Next ===".into())
        );
    }

    #[test]
    fn config_from_flags() {
        let cli = Cli::try_parse_from([
            "ocr2txt",
            "--input",
            "scan.pdf",
            "--output",
            "out",
            "--verbose",
            "False",
            "--dpi",
            "400",
            "--block-size",
            "21",
            "--offset",
            "-5",
            "--no-spellcheck",
            "--jobs",
            "3",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, 400);
        assert_eq!(config.threshold.block_size, 21);
        assert_eq!(config.threshold.offset, -5);
        assert!(!config.spell_check);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.language, "eng");
    }

    #[test]
    fn even_block_size_is_rejected() {
        let cli = Cli::try_parse_from([
            "ocr2txt", "--input", "a.png", "--output", "o", "--verbose", "False", "--block-size",
            "16",
        ])
        .unwrap();
        assert!(build_config(&cli, None).is_err());
    }
}
