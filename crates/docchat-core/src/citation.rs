//! Rewriting of `[CHUNK n, …]` citation markers in model output.
//!
//! The model is asked to cite excerpts by their 1-based rank in the current
//! request's result set. [`rewrite_citations`] replaces each marker with a
//! readable label such as ` (p. 3; "Intro")`, or strips markers entirely
//! in [`CitationMode::None`].
//!
//! Rank numbers are only meaningful within one request: a [`CitationMap`]
//! must be rebuilt for every retrieval and never cached.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::citation::{rewrite_citations, CitationMap, CitationMeta, CitationMode};
//!
//! let mut meta = CitationMap::new();
//! meta.insert(1, CitationMeta { page: Some(3), title: None });
//! let out = rewrite_citations("Shipping is free [CHUNK 1].", &meta, CitationMode::PageOrTitle);
//! assert_eq!(out, "Shipping is free (p. 3).");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// How citation markers are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationMode {
    /// Remove markers.
    None,
    /// `p. N` labels only.
    Page,
    /// `"Heading"` labels only.
    Title,
    /// Page when known, otherwise heading.
    #[default]
    PageOrTitle,
}

impl CitationMode {
    fn wants_page(self) -> bool {
        matches!(self, CitationMode::Page | CitationMode::PageOrTitle)
    }

    fn wants_title(self) -> bool {
        matches!(self, CitationMode::Title | CitationMode::PageOrTitle)
    }
}

impl fmt::Display for CitationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CitationMode::None => "none",
            CitationMode::Page => "page",
            CitationMode::Title => "title",
            CitationMode::PageOrTitle => "page-or-title",
        })
    }
}

impl FromStr for CitationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CitationMode::None),
            "page" => Ok(CitationMode::Page),
            "title" => Ok(CitationMode::Title),
            "page-or-title" => Ok(CitationMode::PageOrTitle),
            other => Err(format!(
                "unknown citation mode '{}'; use none, page, title, or page-or-title",
                other
            )),
        }
    }
}

/// Human-friendly location of one ranked excerpt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CitationMeta {
    fn label(&self, mode: CitationMode) -> Option<String> {
        let page = self
            .page
            .filter(|_| mode.wants_page())
            .map(|p| format!("p. {}", p));
        let title = || {
            self.title
                .as_ref()
                .filter(|_| mode.wants_title())
                .map(|t| format!("\"{}\"", t))
        };
        page.or_else(title)
    }
}

/// Rank number (1-based) → location, for one request.
pub type CitationMap = BTreeMap<usize, CitationMeta>;

/// Any `[CHUNK …]` marker, including malformed ones.
static ANY_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\[CHUNK[^\]]*\]").expect("marker pattern is valid"));

/// A marker whose body is ranks, commas, whitespace and repeated `CHUNK`
/// keywords: `[CHUNK 1, 2]`, `[CHUNK 1, CHUNK 2]`, `[CHUNK 1 2]`, `[CHUNK 1,]`.
static RANKED_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t]*\[CHUNK\s+((?:CHUNK|[\d,\s])*\d(?:CHUNK|[\d,\s])*)\]")
        .expect("ranked marker pattern is valid")
});

static RANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("rank pattern is valid"));

static MULTI_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("space pattern is valid"));

/// Replace or strip citation markers in `answer`.
///
/// - [`CitationMode::None`]: every marker is deleted, leftover double spaces
///   collapsed, and the result trimmed.
/// - Otherwise each marker becomes ` (label1; label2; …)` built from the
///   referenced ranks. Ranks missing from `meta`, or with nothing to show
///   for `mode`, are skipped; a marker with no labels is removed, as is
///   any malformed marker that carries no rank at all.
///
/// Whitespace before a marker is consumed with it, so replacements never
/// leave a doubled space. Never fails.
pub fn rewrite_citations(answer: &str, meta: &CitationMap, mode: CitationMode) -> String {
    if mode == CitationMode::None {
        let stripped = ANY_MARKER_RE.replace_all(answer, "");
        return MULTI_SPACE_RE
            .replace_all(&stripped, " ")
            .trim()
            .to_string();
    }

    let rewritten = RANKED_MARKER_RE.replace_all(answer, |caps: &Captures| {
        let labels: Vec<String> = RANK_RE
            .find_iter(&caps[1])
            .filter_map(|m| m.as_str().parse::<usize>().ok())
            .filter_map(|rank| meta.get(&rank))
            .filter_map(|m| m.label(mode))
            .collect();
        if labels.is_empty() {
            String::new()
        } else {
            format!(" ({})", labels.join("; "))
        }
    });

    // Markers without any rank, e.g. `[CHUNK x]`, never reach the reader.
    ANY_MARKER_RE.replace_all(&rewritten, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_map(entries: &[(usize, Option<u32>, Option<&str>)]) -> CitationMap {
        entries
            .iter()
            .map(|(rank, page, title)| {
                (
                    *rank,
                    CitationMeta {
                        page: *page,
                        title: title.map(str::to_string),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_none_strips_markers() {
        let out = rewrite_citations(
            "See [CHUNK 1, 2] for details.",
            &CitationMap::new(),
            CitationMode::None,
        );
        assert_eq!(out, "See for details.");
    }

    #[test]
    fn test_none_strips_malformed_markers_and_trims() {
        let out = rewrite_citations(
            "[CHUNK x] Start.  Middle [CHUNK] end [CHUNK 3]",
            &CitationMap::new(),
            CitationMode::None,
        );
        assert_eq!(out, "Start. Middle end");
    }

    #[test]
    fn test_page_or_title() {
        let meta = meta_map(&[(1, Some(3), None), (2, None, Some("Intro"))]);
        let out = rewrite_citations(
            "A [CHUNK 1] and B [CHUNK 2].",
            &meta,
            CitationMode::PageOrTitle,
        );
        assert_eq!(out, "A (p. 3) and B (\"Intro\").");
    }

    #[test]
    fn test_page_or_title_prefers_page() {
        let meta = meta_map(&[(1, Some(7), Some("Scope"))]);
        let out = rewrite_citations("X [CHUNK 1].", &meta, CitationMode::PageOrTitle);
        assert_eq!(out, "X (p. 7).");
    }

    #[test]
    fn test_unresolved_rank_removes_marker() {
        let meta = meta_map(&[(1, Some(1), None)]);
        assert_eq!(
            rewrite_citations("[CHUNK 5]", &meta, CitationMode::PageOrTitle),
            ""
        );
        assert_eq!(
            rewrite_citations("Done [CHUNK 5].", &meta, CitationMode::Page),
            "Done."
        );
    }

    #[test]
    fn test_multiple_ranks_joined() {
        let meta = meta_map(&[(1, Some(2), None), (2, Some(9), None), (4, None, None)]);
        let out = rewrite_citations("Fact [CHUNK 1, 4, 2, 8].", &meta, CitationMode::Page);
        assert_eq!(out, "Fact (p. 2; p. 9).");
    }

    #[test]
    fn test_repeated_chunk_keyword() {
        let meta = meta_map(&[(1, Some(1), None), (6, Some(4), None)]);
        let out = rewrite_citations("Both [CHUNK 1, CHUNK 6].", &meta, CitationMode::Page);
        assert_eq!(out, "Both (p. 1; p. 4).");
    }

    #[test]
    fn test_loose_rank_lists_are_rewritten() {
        let meta = meta_map(&[(1, Some(2), None), (2, Some(5), None)]);
        assert_eq!(
            rewrite_citations("A [CHUNK 1,].", &meta, CitationMode::Page),
            "A (p. 2)."
        );
        assert_eq!(
            rewrite_citations("B [CHUNK 1 2].", &meta, CitationMode::Page),
            "B (p. 2; p. 5)."
        );
        assert_eq!(
            rewrite_citations("C [CHUNK 2 ].", &meta, CitationMode::PageOrTitle),
            "C (p. 5)."
        );
    }

    #[test]
    fn test_rankless_markers_are_removed_in_every_mode() {
        let meta = meta_map(&[(1, Some(2), None)]);
        assert_eq!(
            rewrite_citations("D [CHUNK x] and [CHUNK] [CHUNK 1].", &meta, CitationMode::Page),
            "D and (p. 2)."
        );
    }

    #[test]
    fn test_page_mode_ignores_titles() {
        let meta = meta_map(&[(1, None, Some("Intro"))]);
        assert_eq!(
            rewrite_citations("Y [CHUNK 1].", &meta, CitationMode::Page),
            "Y."
        );
    }

    #[test]
    fn test_title_mode_ignores_pages() {
        let meta = meta_map(&[(1, Some(5), Some("Terms")), (2, Some(6), None)]);
        assert_eq!(
            rewrite_citations("Z [CHUNK 1, 2].", &meta, CitationMode::Title),
            "Z (\"Terms\")."
        );
    }

    #[test]
    fn test_newlines_are_kept() {
        let meta = meta_map(&[(1, Some(2), None)]);
        let out = rewrite_citations("Line one [CHUNK 1].\nLine two.", &meta, CitationMode::Page);
        assert_eq!(out, "Line one (p. 2).\nLine two.");
    }

    #[test]
    fn test_text_without_markers_unchanged() {
        let meta = meta_map(&[(1, Some(2), None)]);
        let text = "Nothing to cite here.";
        assert_eq!(rewrite_citations(text, &meta, CitationMode::PageOrTitle), text);
    }

    #[test]
    fn test_mode_parse_and_display() {
        for mode in [
            CitationMode::None,
            CitationMode::Page,
            CitationMode::Title,
            CitationMode::PageOrTitle,
        ] {
            assert_eq!(mode.to_string().parse::<CitationMode>(), Ok(mode));
        }
        assert!("pages".parse::<CitationMode>().is_err());
    }

    #[test]
    fn test_meta_json_shape() {
        let meta: CitationMap = serde_json::from_str(r#"{"1": {"page": 3}, "2": {"title": "Intro"}}"#).unwrap();
        assert_eq!(meta[&1].page, Some(3));
        assert_eq!(meta[&2].title.as_deref(), Some("Intro"));
    }
}
