//! Text output: write every page's corrected text to a `.txt` file.
//!
//! The file is opened with truncation, so rerunning a conversion replaces
//! the previous result instead of appending to it. Pages go out in page
//! order; the configured separator is placed between pages only, never
//! before the first or after the last.

use crate::config::PageSeparator;
use crate::error::OcrError;
use crate::output::PageResult;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Output file for a user-supplied name: `<name>.txt`.
///
/// A name that already ends in `.txt` (any case) is used unchanged.
pub fn output_path(name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    let has_txt = name
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    if has_txt {
        name.to_path_buf()
    } else {
        let mut s = name.as_os_str().to_os_string();
        s.push(".txt");
        PathBuf::from(s)
    }
}

/// Join page texts with the separator between consecutive pages.
pub fn assemble_text(pages: &[PageResult], separator: &PageSeparator) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.text.len()).sum());
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator.render(page.page_num));
        }
        out.push_str(&page.text);
    }
    out
}

/// Write pages to `path`, replacing any existing file.
///
/// Returns the number of bytes written.
pub async fn write_pages(
    path: &Path,
    pages: &[PageResult],
    separator: &PageSeparator,
) -> Result<usize, OcrError> {
    let write_err = |source: std::io::Error| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut file = tokio::fs::File::create(path).await.map_err(write_err)?;
    let mut written = 0;

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            let sep = separator.render(page.page_num);
            file.write_all(sep.as_bytes()).await.map_err(write_err)?;
            written += sep.len();
        }
        file.write_all(page.text.as_bytes()).await.map_err(write_err)?;
        written += page.text.len();
        debug!("Wrote page {} ({} bytes)", page.page_num, page.text.len());
    }

    file.flush().await.map_err(write_err)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, text: &str) -> PageResult {
        PageResult {
            page_num: n,
            raw_text: text.to_string(),
            text: text.to_string(),
            corrections: 0,
            duration_ms: 0,
        }
    }

    #[test]
    fn output_path_appends_txt() {
        assert_eq!(output_path("result"), PathBuf::from("result.txt"));
        assert_eq!(output_path("out/scan.v2"), PathBuf::from("out/scan.v2.txt"));
        assert_eq!(output_path("notes.txt"), PathBuf::from("notes.txt"));
        assert_eq!(output_path("NOTES.TXT"), PathBuf::from("NOTES.TXT"));
    }

    #[test]
    fn assemble_without_separator_concatenates() {
        let pages = [page(1, "alpha\n"), page(2, "beta\n")];
        assert_eq!(assemble_text(&pages, &PageSeparator::None), "alpha\nbeta\n");
    }

    #[test]
    fn separator_only_between_pages() {
        let pages = [page(1, "a"), page(2, "b"), page(3, "c")];
        let text = assemble_text(&pages, &PageSeparator::FormFeed);
        assert_eq!(text, "a\x0cb\x0cc");
        assert_eq!(assemble_text(&pages[..1], &PageSeparator::FormFeed), "a");
        assert_eq!(assemble_text(&[], &PageSeparator::FormFeed), "");
    }

    #[tokio::test]
    async fn rerun_overwrites_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");

        write_pages(&path, &[page(1, "first run, longer text\n")], &PageSeparator::None)
            .await
            .unwrap();
        let n = write_pages(&path, &[page(1, "second\n")], &PageSeparator::None)
            .await
            .unwrap();

        assert_eq!(n, 7);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[tokio::test]
    async fn writes_pages_in_order_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.txt");
        let pages = [page(1, "one "), page(2, "two "), page(3, "three")];

        let n = write_pages(&path, &pages, &PageSeparator::PageNumber)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "one \n--- page 2 ---\ntwo \n--- page 3 ---\nthree"
        );
        assert_eq!(n, content.len());
    }

    #[tokio::test]
    async fn unwritable_target_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a file.
        let err = write_pages(dir.path(), &[page(1, "x")], &PageSeparator::None)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::OutputWriteFailed { .. }));
    }
}
