//! Error type for the retrieval core.

use std::fmt;

/// External capability that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Embedding,
    Completion,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Embedding => f.write_str("embedding"),
            Capability::Completion => f.write_str("completion"),
        }
    }
}

/// Errors raised while building an index, retrieving, or answering.
///
/// Upstream failures are never retried here; they terminate the enclosing
/// operation and carry the provider's error as their source.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("{capability} capability failed: {source}")]
    Upstream {
        capability: Capability,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("embedding capability returned {actual} vectors for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("embedding dimensionality mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl RagError {
    pub(crate) fn upstream(capability: Capability, err: anyhow::Error) -> Self {
        RagError::Upstream {
            capability,
            source: err.into(),
        }
    }

    /// True when the failure came from an external capability call.
    pub fn is_upstream(&self) -> bool {
        matches!(self, RagError::Upstream { .. })
    }
}
