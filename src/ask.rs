//! `docchat ask`: one grounded chat turn over a document.

use anyhow::Result;
use docchat_core::chat::Answer;
use docchat_core::citation::CitationMode;
use docchat_core::completion::ChatMessage;

use crate::app::App;
use crate::config::Config;
use crate::docref::DocumentRef;

/// Answer `question` about the referenced document.
pub async fn ask(
    config: &Config,
    doc: &DocumentRef,
    question: &str,
    mode: Option<CitationMode>,
) -> Result<Answer> {
    let app = App::from_config(config, mode)?;
    let loaded = app.load(doc).await?;
    let messages = [ChatMessage::user(question)];
    Ok(app.engine().answer(&messages, Some(&loaded)).await?)
}

pub async fn run_ask(
    config: &Config,
    doc: &DocumentRef,
    question: &str,
    mode: Option<CitationMode>,
    json: bool,
) -> Result<()> {
    let answer = ask(config, doc, question, mode).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.text);
    Ok(())
}
