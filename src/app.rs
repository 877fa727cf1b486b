//! Wiring from [`Config`] to the core pipeline.
//!
//! Builds the embedding and completion providers, the index cache, the chat
//! engine and the filesystem text source. Commands that need the network go
//! through [`App`]; offline commands only use [`load_document`].

use anyhow::{anyhow, Context, Result};
use docchat_core::cache::IndexCache;
use docchat_core::chat::{ChatEngine, ChatSettings};
use docchat_core::citation::CitationMode;
use docchat_core::source::{LoadedDocument, TextSource};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::completion::create_completer;
use crate::config::Config;
use crate::docref::DocumentRef;
use crate::embedding::create_embedder;
use crate::source::FsTextSource;

pub struct App {
    source: FsTextSource,
    engine: ChatEngine,
}

impl App {
    /// Build providers from `config`.
    ///
    /// `mode` overrides `[citations].mode` for this process.
    pub fn from_config(config: &Config, mode: Option<CitationMode>) -> Result<Self> {
        let source = FsTextSource::new(&config.source)?;
        let embedder = create_embedder(&config.embedding)?;
        let completer = create_completer(&config.completion)?;

        let capacity = NonZeroUsize::new(config.cache.capacity)
            .ok_or_else(|| anyhow!("cache.capacity must be >= 1"))?;
        let cache = IndexCache::new(embedder, capacity)
            .with_chunking(config.chunking.params())
            .with_batch_size(config.embedding.batch_size);

        let settings = ChatSettings {
            top_k: config.retrieval.top_k,
            citation_mode: mode.unwrap_or(config.citations.mode),
        };
        debug!(
            root = %source.root().display(),
            embedding = %config.embedding.provider,
            completion = %config.completion.provider,
            top_k = settings.top_k,
            citation_mode = %settings.citation_mode,
            "initialized chat engine"
        );

        Ok(Self {
            source,
            engine: ChatEngine::new(Arc::new(cache), completer, settings),
        })
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    /// Load the freshest version of the referenced document.
    pub async fn load(&self, doc: &DocumentRef) -> Result<LoadedDocument> {
        load_from(&self.source, doc).await
    }
}

/// Load a document without building any providers.
pub async fn load_document(config: &Config, doc: &DocumentRef) -> Result<LoadedDocument> {
    let source = FsTextSource::new(&config.source)?;
    load_from(&source, doc).await
}

async fn load_from(source: &dyn TextSource, doc: &DocumentRef) -> Result<LoadedDocument> {
    let id = doc
        .document_id()
        .ok_or_else(|| anyhow!("Could not derive a document id from {:?}", doc))?;
    source
        .load(&id)
        .await
        .with_context(|| format!("Failed to load document '{}' from {}", id, source.name()))
}
