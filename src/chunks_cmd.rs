//! `docchat chunks`: show how a document is split, without embedding it.

use anyhow::{bail, Result};
use docchat_core::chunk::chunk_text;
use docchat_core::locate::CitationLocator;
use serde::Serialize;

use crate::app::load_document;
use crate::config::Config;
use crate::docref::DocumentRef;

/// One chunk with its located page and heading.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary {
    pub id: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub chars: usize,
}

/// Chunk `text` with the configured parameters and locate every chunk.
pub fn summarize_chunks(config: &Config, text: &str) -> Vec<ChunkSummary> {
    let locator = CitationLocator::new(text);
    chunk_text(text, &config.chunking.params())
        .into_iter()
        .map(|chunk| {
            let meta = locator.locate(chunk.start);
            ChunkSummary {
                chars: chunk.end - chunk.start,
                id: chunk.id,
                start: chunk.start,
                end: chunk.end,
                page: meta.page,
                heading: meta.title,
            }
        })
        .collect()
}

pub async fn run_chunks(config: &Config, doc: &DocumentRef, json: bool) -> Result<()> {
    let loaded = load_document(config, doc).await?;
    let Some(text) = loaded.text.as_deref() else {
        bail!(
            "Document '{}' ({}) is not text-readable",
            loaded.id,
            loaded.mime_type
        );
    };

    let chunks = summarize_chunks(config, text);
    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    let mut header = format!(
        "{} ({}, version {}): {} chunks",
        loaded.name,
        loaded.mime_type,
        short_version(&loaded.version),
        chunks.len()
    );
    if let Some(pages) = CitationLocator::new(text).page_count() {
        header.push_str(&format!(", {} pages", pages));
    }
    println!("{}", header);
    for chunk in &chunks {
        let mut line = format!("{}  [{}..{})", chunk.id, chunk.start, chunk.end);
        if let Some(page) = chunk.page {
            line.push_str(&format!("  page={}", page));
        }
        if let Some(heading) = &chunk.heading {
            line.push_str(&format!("  heading=\"{}\"", heading));
        }
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn short_version(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;

    #[test]
    fn test_summaries_carry_page_and_heading() {
        let config = Config {
            chunking: ChunkingConfig {
                target_chars: 20,
                overlap_chars: 0,
                max_chunks: 100,
            },
            ..Config::default()
        };
        let text = "# Intro\nhello world.\u{000C}# Setup\ninstall it now.";
        let chunks = summarize_chunks(&config, text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "c0");
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[0].heading, None);
        assert_eq!(chunks[1].page, Some(1));
        assert_eq!(chunks[1].heading.as_deref(), Some("# Intro"));
        let last = chunks.last().unwrap();
        assert_eq!(last.page, Some(2));
        assert_eq!(last.heading.as_deref(), Some("# Setup"));
        assert_eq!(last.end, text.chars().count());
    }

    #[test]
    fn test_short_version() {
        assert_eq!(short_version("abcdef0123456789"), "abcdef012345");
        assert_eq!(short_version("abc"), "abc");
    }
}
