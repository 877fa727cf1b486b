//! Chat completion providers.
//!
//! Implementations of [`docchat_core::completion::Completer`] for the OpenAI
//! chat completions API and Ollama's `/api/chat`, plus a disabled provider.
//! Model and temperature come from `[completion]`; retries follow
//! [`crate::http`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use docchat_core::completion::{ChatMessage, Completer};
use std::sync::Arc;

use crate::config::CompletionConfig;
use crate::embedding::DEFAULT_OLLAMA_URL;
use crate::http;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Always fails; used when `completion.provider = "disabled"`.
pub struct DisabledCompleter;

#[async_trait]
impl Completer for DisabledCompleter {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("Completion provider is disabled; set [completion].provider in the config")
    }
}

/// Calls `POST /v1/chat/completions`. Requires `OPENAI_API_KEY`.
pub struct OpenAICompleter {
    model: String,
    temperature: f32,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAICompleter {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        let json = http::post_json(
            &self.client,
            OPENAI_CHAT_URL,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_reply(&json)
    }
}

/// `choices[0].message.content`; a missing or null content is an empty reply.
fn parse_openai_reply(json: &serde_json::Value) -> Result<String> {
    let choices = json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices array"))?;

    Ok(choices
        .first()
        .and_then(|c| c.pointer("/message/content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Calls `POST /api/chat` on a local Ollama instance with streaming off.
pub struct OllamaCompleter {
    model: String,
    temperature: f32,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaCompleter {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            url: url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Completer for OllamaCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/chat", self.url),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_reply(&json)
    }
}

fn parse_ollama_reply(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))
}

/// Create the [`Completer`] selected by `config.provider`.
pub fn create_completer(config: &CompletionConfig) -> Result<Arc<dyn Completer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledCompleter)),
        "openai" => Ok(Arc::new(OpenAICompleter::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaCompleter::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}
