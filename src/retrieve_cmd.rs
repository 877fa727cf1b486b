//! `docchat retrieve`: rank a document's excerpts against a query.

use anyhow::Result;
use docchat_core::context::RankedExcerpt;
use serde::Serialize;

use crate::app::App;
use crate::chunks_cmd::short_version;
use crate::config::Config;
use crate::docref::DocumentRef;

#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResponse {
    pub document_id: String,
    pub version: String,
    pub query: String,
    pub excerpts: Vec<RankedExcerpt>,
}

pub async fn run_retrieve(
    config: &Config,
    doc: &DocumentRef,
    query: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let app = App::from_config(config, None)?;
    let loaded = app.load(doc).await?;
    let top_k = k.unwrap_or(config.retrieval.top_k);
    let excerpts = app.engine().excerpts_for(&loaded, query, top_k).await?;

    if json {
        let response = RetrieveResponse {
            document_id: loaded.id,
            version: loaded.version,
            query: query.to_string(),
            excerpts,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if loaded.text.is_none() {
        println!("{} is not text-readable ({}).", loaded.name, loaded.mime_type);
        return Ok(());
    }
    if excerpts.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} (version {}): top {} of query \"{}\"",
        loaded.name,
        short_version(&loaded.version),
        excerpts.len(),
        query
    );
    println!();
    for excerpt in &excerpts {
        println!("{} score={:.4}", excerpt.header(), excerpt.score);
        println!("    {}", preview(&excerpt.text, 240));
        println!();
    }
    Ok(())
}

/// First `max_chars` of `text` on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\n\tb\x0Cc", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
