//! Text source abstraction.
//!
//! A [`TextSource`] resolves a document id to its metadata and, when the
//! document is text-representable, its raw text. The `version` it reports is
//! what the index cache keys on, so it must change whenever the text does.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::DocumentKey;

/// A document as loaded from a [`TextSource`].
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDocument {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Last modification time (RFC 3339).
    pub modified_time: String,
    pub version: String,
    /// Raw text; `None` for documents with no text representation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl LoadedDocument {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.id.clone(), self.version.clone())
    }
}

/// Resolves document ids to loaded documents.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Short label used in logs and CLI output (e.g. `"filesystem"`).
    fn name(&self) -> &str;

    /// Load the freshest version of a document.
    async fn load(&self, document_id: &str) -> Result<LoadedDocument>;
}
