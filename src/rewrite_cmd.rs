//! `docchat rewrite`: apply citation rewriting to arbitrary text.

use anyhow::{Context, Result};
use docchat_core::citation::{rewrite_citations, CitationMap, CitationMode};

/// Parse a `{"1": {"page": 3}, "2": {"title": "Intro"}}` citation map.
pub fn parse_citation_map(json: &str) -> Result<CitationMap> {
    serde_json::from_str(json)
        .context("Invalid citation map; expected {\"<rank>\": {\"page\": N, \"title\": \"T\"}}")
}

pub fn run_rewrite(text: &str, meta_json: &str, mode: CitationMode) -> Result<()> {
    let meta = parse_citation_map(meta_json)?;
    println!("{}", rewrite_citations(text, &meta, mode));
    Ok(())
}
