//! One chat turn over an optional attached document.
//!
//! [`ChatEngine::answer`] wires the pipeline together:
//!
//! ```text
//! attachment ─▶ IndexCache::build_or_load ─▶ retrieve(last user message)
//!            ─▶ rank_excerpts ─▶ context block ─▶ Completer ─▶ rewrite_citations
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::IndexCache;
use crate::citation::{rewrite_citations, CitationMode};
use crate::completion::{assemble_messages, last_user_message, ChatMessage, Completer};
use crate::context::{
    citation_map, non_text_notice, rank_excerpts, render_context_block, RankedExcerpt,
};
use crate::error::{Capability, RagError};
use crate::retrieve::{retrieve, DEFAULT_TOP_K};
use crate::source::LoadedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSettings {
    pub top_k: usize,
    pub citation_mode: CitationMode,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            citation_mode: CitationMode::default(),
        }
    }
}

/// Result of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Model output with citation markers rewritten.
    pub text: String,
    /// Excerpts shown to the model, best first.
    pub excerpts: Vec<RankedExcerpt>,
}

pub struct ChatEngine {
    cache: Arc<IndexCache>,
    completer: Arc<dyn Completer>,
    settings: ChatSettings,
}

impl ChatEngine {
    pub fn new(cache: Arc<IndexCache>, completer: Arc<dyn Completer>, settings: ChatSettings) -> Self {
        Self {
            cache,
            completer,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    pub fn settings(&self) -> ChatSettings {
        self.settings
    }

    /// Excerpts of `doc` most relevant to `query`.
    ///
    /// Documents without text yield no excerpts.
    pub async fn excerpts_for(
        &self,
        doc: &LoadedDocument,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RankedExcerpt>, RagError> {
        let Some(text) = doc.text.as_deref() else {
            return Ok(Vec::new());
        };
        let index = self.cache.build_or_load(&doc.id, &doc.version, text).await?;
        let hits = retrieve(&index, query, top_k, self.cache.embedder().as_ref()).await?;
        Ok(rank_excerpts(text, &hits))
    }

    /// Answer the last user message in `messages`, grounded in `attachment`.
    ///
    /// # Errors
    ///
    /// Any embedding or completion failure aborts the turn.
    pub async fn answer(
        &self,
        messages: &[ChatMessage],
        attachment: Option<&LoadedDocument>,
    ) -> Result<Answer, RagError> {
        let mut excerpts = Vec::new();
        let context = match attachment {
            Some(doc) if doc.text.is_some() => {
                let query = last_user_message(messages);
                excerpts = self.excerpts_for(doc, query, self.settings.top_k).await?;
                Some(render_context_block(doc, &excerpts))
            }
            Some(doc) => {
                debug!(document = %doc.id, mime = %doc.mime_type, "attachment is not text-readable");
                Some(non_text_notice(doc))
            }
            None => None,
        };

        let prompt = assemble_messages(context.as_deref(), messages);
        let raw = self
            .completer
            .complete(&prompt)
            .await
            .map_err(|e| RagError::upstream(Capability::Completion, e))?;

        info!(
            model = self.completer.model_name(),
            excerpts = excerpts.len(),
            "completed chat turn"
        );

        let text = if excerpts.is_empty() {
            raw
        } else {
            rewrite_citations(&raw, &citation_map(&excerpts), self.settings.citation_mode)
        };

        Ok(Answer { text, excerpts })
    }
}
