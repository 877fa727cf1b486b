//! Excerpt ranking and context-block rendering.
//!
//! Turns a retrieval result into numbered [`RankedExcerpt`]s, the per-request
//! [`CitationMap`], and the text block handed to the completion capability.

use serde::Serialize;

use crate::citation::{CitationMap, CitationMeta};
use crate::locate::CitationLocator;
use crate::models::ScoredChunk;
use crate::source::LoadedDocument;

/// One retrieved chunk, numbered by its 1-based rank in this request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedExcerpt {
    pub rank: usize,
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RankedExcerpt {
    pub fn citation(&self) -> CitationMeta {
        CitationMeta {
            page: self.page,
            title: self.title.clone(),
        }
    }

    /// `[CHUNK n id=… start=… end=…]` header line, with page and title when known.
    pub fn header(&self) -> String {
        let mut header = format!(
            "[CHUNK {} id={} start={} end={}",
            self.rank, self.id, self.start, self.end
        );
        if let Some(page) = self.page {
            header.push_str(&format!(" page={}", page));
        }
        if let Some(title) = &self.title {
            header.push_str(&format!(" title=\"{}\"", title));
        }
        header.push(']');
        header
    }
}

/// Number `hits` from 1 and attach page and heading located in `text`.
///
/// `text` must be the document body the index was built from.
pub fn rank_excerpts(text: &str, hits: &[ScoredChunk<'_>]) -> Vec<RankedExcerpt> {
    let locator = CitationLocator::new(text);
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let meta = locator.locate(hit.start());
            RankedExcerpt {
                rank: i + 1,
                id: hit.id().to_string(),
                start: hit.start(),
                end: hit.end(),
                score: hit.score,
                text: hit.text().to_string(),
                page: meta.page,
                title: meta.title,
            }
        })
        .collect()
}

/// Rank → location map for [`rewrite_citations`](crate::citation::rewrite_citations).
pub fn citation_map(excerpts: &[RankedExcerpt]) -> CitationMap {
    excerpts.iter().map(|e| (e.rank, e.citation())).collect()
}

/// Context block listing `excerpts` from `doc`.
pub fn render_context_block(doc: &LoadedDocument, excerpts: &[RankedExcerpt]) -> String {
    let body = excerpts
        .iter()
        .map(|e| format!("{}\n{}", e.header(), e.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "You have access to an attached document (freshest version).\n\
         File: {} (mime={}, modified={})\n\
         The following are the most relevant excerpts. Cite them by [CHUNK N] in your answer.\n\
         BEGIN_EXCERPTS\n{}\nEND_EXCERPTS\n",
        doc.name, doc.mime_type, doc.modified_time, body
    )
}

/// One-line notice for an attachment with no text representation.
pub fn non_text_notice(doc: &LoadedDocument) -> String {
    format!(
        "A document is attached (id={}, name={}, mime={}, modified={}), but it is not text-readable here.",
        doc.id, doc.name, doc.mime_type, doc.modified_time
    )
}
