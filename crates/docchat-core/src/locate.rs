//! Citation locator: page numbers and nearest headings for text offsets.
//!
//! Both lookups are heuristics over the original, unchunked document text,
//! addressed by the character offset of a retrieved chunk's `start`.
//!
//! - **Pages**: the text separates pages with form feeds (`\x0C`), the
//!   convention PDF text extraction follows. A document without form feeds
//!   has no meaningful pagination and every lookup returns `None`.
//! - **Headings**: scanning backwards line by line through a bounded window
//!   before the offset, the first non-empty line that looks like a heading
//!   (Markdown `#`, numbered outline `1.2 Title`, or a short capitalised line)
//!   wins.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::locate::CitationLocator;
//!
//! let locator = CitationLocator::new("A\x0CB\x0CC");
//! assert_eq!(locator.page_for_offset(0), Some(1));
//! assert_eq!(locator.page_for_offset(4), Some(3));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::citation::CitationMeta;

/// Page separator in extracted text.
pub const PAGE_BREAK: char = '\u{000C}';

/// Characters scanned backwards when looking for a heading.
pub const HEADING_WINDOW_CHARS: usize = 6000;

/// Headings longer than this are treated as body text.
const MAX_HEADING_CHARS: usize = 120;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s+.+|(?:\d+\.)+\d*\s+.+|[A-Z][A-Za-z0-9 .,&/()-]{3,}:?)\s*$")
        .expect("heading pattern is valid")
});

static TRAILING_COLON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*:$").expect("colon pattern is valid")
});

/// Page and heading lookups over one document's text.
///
/// Page starts are computed once; build one locator per request and call
/// [`locate`](CitationLocator::locate) for each retrieved chunk.
#[derive(Debug, Clone)]
pub struct CitationLocator<'a> {
    text: &'a str,
    /// Char offsets where a page begins; `0` is always the first entry.
    page_starts: Vec<usize>,
}

impl<'a> CitationLocator<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            page_starts: compute_page_starts(text),
        }
    }

    /// Number of pages, or `None` when the text has no page breaks.
    pub fn page_count(&self) -> Option<usize> {
        (self.page_starts.len() > 1).then_some(self.page_starts.len())
    }

    /// 1-based page containing `offset`.
    ///
    /// Returns `None` for single-page text: pagination is not meaningful there,
    /// which is different from asserting page one.
    pub fn page_for_offset(&self, offset: usize) -> Option<u32> {
        if self.page_starts.len() <= 1 {
            return None;
        }
        let page = self.page_starts.partition_point(|&start| start <= offset);
        u32::try_from(page.max(1)).ok()
    }

    /// Nearest heading-like line above `offset`, without a trailing colon.
    pub fn nearest_heading(&self, offset: usize) -> Option<String> {
        nearest_heading_above(self.text, offset)
    }

    /// Page and heading for a chunk starting at `offset`.
    pub fn locate(&self, offset: usize) -> CitationMeta {
        CitationMeta {
            page: self.page_for_offset(offset),
            title: self.nearest_heading(offset),
        }
    }
}

/// Char offsets at which pages start: `0`, then one past every form feed.
pub fn compute_page_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in text.chars().enumerate() {
        if c == PAGE_BREAK {
            starts.push(i + 1);
        }
    }
    starts
}

/// Scan at most [`HEADING_WINDOW_CHARS`] before `offset` for a heading line.
pub fn nearest_heading_above(text: &str, offset: usize) -> Option<String> {
    let window_start = offset.saturating_sub(HEADING_WINDOW_CHARS);
    let from = char_to_byte(text, window_start);
    let to = char_to_byte(text, offset);
    let window = &text[from..to];

    // A page break also ends a line: extracted pages are joined without newlines.
    window
        .split(['\n', PAGE_BREAK])
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| line.chars().count() <= MAX_HEADING_CHARS && HEADING_RE.is_match(line))
        .map(|line| TRAILING_COLON_RE.replace(line, "").into_owned())
}

/// Byte index of the `n`th char, clamped to the end of the string.
fn char_to_byte(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
