//! Spell correction of recognised text against a word-frequency dictionary.
//!
//! OCR errors are mostly single-glyph confusions (`rn`→`m`, `l`→`1`, a
//! dropped or doubled letter), i.e. one or two edits away from the intended
//! word. For every alphabetic token the corrector:
//!
//! 1. keeps it if the dictionary knows it;
//! 2. otherwise looks up every string one edit away (delete, transpose,
//!    replace, insert) and picks the most frequent known word;
//! 3. failing that, and only for tokens up to [`MAX_EDIT2_LEN`] letters,
//!    does the same at two edits;
//! 4. otherwise leaves the token alone.
//!
//! ASCII runs glued to accented letters ("café") are never touched.
//! Casing of the original token is re-applied to the replacement. Digits,
//! punctuation and whitespace are copied through untouched, so line layout
//! survives correction.

use crate::error::OcrError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use strsim::damerau_levenshtein;
use tracing::debug;

/// Tokens longer than this skip the edit-distance-2 search.
pub const MAX_EDIT2_LEN: usize = 10;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Rank-ordered English word list, most frequent first.
static ENGLISH_WORDS: &str = include_str!("../../data/en_words.txt");

static ENGLISH: Lazy<Speller> = Lazy::new(|| Speller::parse(ENGLISH_WORDS));

static RE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?").unwrap());

/// A dictionary-backed spell corrector.
#[derive(Debug, Clone, Default)]
pub struct Speller {
    frequencies: HashMap<String, u64>,
}

impl Speller {
    /// The built-in English model, parsed once per process.
    pub fn english() -> &'static Speller {
        &ENGLISH
    }

    /// Load a dictionary file.
    ///
    /// Each non-empty line is either `word` (frequency taken from the line's
    /// rank, most frequent first) or `word count`. Lines starting with `#`
    /// are comments.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Speller, OcrError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OcrError::DictionaryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let speller = Speller::parse(&content);
        if speller.is_empty() {
            return Err(OcrError::EmptyDictionary {
                path: path.to_path_buf(),
            });
        }
        debug!("Loaded {} words from {}", speller.len(), path.display());
        Ok(speller)
    }

    /// Parse dictionary text in the [`Speller::from_file`] format.
    pub fn parse(content: &str) -> Speller {
        let mut frequencies = HashMap::new();
        let mut rank: u64 = 0;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else { continue };
            if !word.chars().all(|c| c.is_ascii_alphabetic() || c == '\'') {
                continue;
            }

            rank += 1;
            let count = fields
                .next()
                .and_then(|c| c.parse::<u64>().ok())
                .unwrap_or(1_000_000_000 / rank);

            let entry = frequencies.entry(word.to_ascii_lowercase()).or_insert(0);
            *entry = (*entry).max(count);
        }

        Speller { frequencies }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Whether `word` (any case) is in the dictionary.
    pub fn contains(&self, word: &str) -> bool {
        self.frequencies.contains_key(&word.to_ascii_lowercase())
    }

    /// Spell-correct a block of text.
    pub fn correct(&self, text: &str) -> String {
        self.correct_with_count(text).0
    }

    /// Spell-correct a block of text, also returning how many words changed.
    pub fn correct_with_count(&self, text: &str) -> (String, usize) {
        let mut out = String::with_capacity(text.len());
        let mut memo: HashMap<String, Option<String>> = HashMap::new();
        let mut changed = 0;
        let mut last = 0;

        for m in RE_WORD.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            last = m.end();

            let token = m.as_str();
            let case = WordCase::of(token);
            if case == WordCase::Untouchable
                || touches_non_ascii_letter(text, m.start(), m.end())
            {
                out.push_str(token);
                continue;
            }

            let lower = token.to_ascii_lowercase();
            let suggestion = memo
                .entry(lower.clone())
                .or_insert_with(|| self.suggest(&lower))
                .clone();

            match suggestion {
                Some(fixed) => {
                    debug!("Spell correction: '{}' -> '{}'", token, fixed);
                    out.push_str(&case.apply(&fixed));
                    changed += 1;
                }
                None => out.push_str(token),
            }
        }
        out.push_str(&text[last..]);

        (out, changed)
    }

    /// Best replacement for a lowercase word, or `None` to keep it as is.
    pub fn suggest(&self, word: &str) -> Option<String> {
        if word.is_empty() || self.frequencies.contains_key(word) {
            return None;
        }

        let near = edits1(word);
        if let Some(best) = self.most_frequent(word, near.iter()) {
            return Some(best);
        }

        if word.len() > MAX_EDIT2_LEN {
            return None;
        }

        let far: HashSet<String> = near
            .iter()
            .flat_map(|e| edits1(e))
            .filter(|e| self.frequencies.contains_key(e))
            .collect();
        self.most_frequent(word, far.iter())
    }

    fn most_frequent<'a>(
        &self,
        word: &str,
        candidates: impl Iterator<Item = &'a String>,
    ) -> Option<String> {
        candidates
            .filter_map(|c| self.frequencies.get(c).map(|&f| (c, f)))
            .max_by(|(a, fa), (b, fb)| {
                fa.cmp(fb)
                    .then_with(|| damerau_levenshtein(word, b).cmp(&damerau_levenshtein(word, a)))
                    .then_with(|| b.cmp(a))
            })
            .map(|(c, _)| c.clone())
    }
}

/// Whether the ASCII run `text[start..end]` is glued to a non-ASCII letter,
/// as in "café" or "naïve". Such runs are fragments of a longer word.
fn touches_non_ascii_letter(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    [before, after]
        .into_iter()
        .flatten()
        .any(|c| c.is_alphabetic())
}

/// All strings one edit away from `word` (ASCII lowercase input).
fn edits1(word: &str) -> HashSet<String> {
    let bytes = word.as_bytes();
    let n = bytes.len();
    let mut out = HashSet::with_capacity(54 * n + 25);

    let mut push = |v: Vec<u8>| {
        if let Ok(s) = String::from_utf8(v) {
            out.insert(s);
        }
    };

    for i in 0..n {
        // deletion
        let mut v = bytes.to_vec();
        v.remove(i);
        push(v);

        // transposition
        if i + 1 < n {
            let mut v = bytes.to_vec();
            v.swap(i, i + 1);
            push(v);
        }

        // substitution
        for &c in ALPHABET {
            if c != bytes[i] {
                let mut v = bytes.to_vec();
                v[i] = c;
                push(v);
            }
        }
    }

    // insertion
    for i in 0..=n {
        for &c in ALPHABET {
            let mut v = Vec::with_capacity(n + 1);
            v.extend_from_slice(&bytes[..i]);
            v.push(c);
            v.extend_from_slice(&bytes[i..]);
            push(v);
        }
    }

    out.remove(word);
    out
}

/// Casing shape of a token, re-applied to its correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordCase {
    Lower,
    Upper,
    Title,
    /// Single letters and mixed case ("iPhone", "McDonald") are left alone.
    Untouchable,
}

impl WordCase {
    fn of(token: &str) -> WordCase {
        let letters: Vec<char> = token.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if letters.len() < 2 {
            return WordCase::Untouchable;
        }
        if letters.iter().all(|c| c.is_ascii_lowercase()) {
            WordCase::Lower
        } else if letters.iter().all(|c| c.is_ascii_uppercase()) {
            WordCase::Upper
        } else if letters[0].is_ascii_uppercase() && letters[1..].iter().all(|c| c.is_ascii_lowercase()) {
            WordCase::Title
        } else {
            WordCase::Untouchable
        }
    }

    fn apply(self, word: &str) -> String {
        match self {
            WordCase::Lower | WordCase::Untouchable => word.to_string(),
            WordCase::Upper => word.to_ascii_uppercase(),
            WordCase::Title => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            }
        }
    }
}
