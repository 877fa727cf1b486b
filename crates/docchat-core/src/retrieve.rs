//! Semantic retrieval over a built [`Index`].
//!
//! The query is embedded once and every chunk is scored by cosine similarity.
//! Scores are a pure function of the two vectors, so ranking is deterministic:
//! ties keep the chunks' original (offset) order.

use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Capability, RagError};
use crate::models::{Index, ScoredChunk};

/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 8;

/// Return the `max(1, k)` chunks most similar to `query`, best first.
///
/// An empty index or a blank query returns an empty result without calling
/// the embedder.
///
/// # Errors
///
/// [`RagError::Upstream`] if embedding the query fails,
/// [`RagError::EmbeddingCount`] if the embedder returns no vector, or
/// [`RagError::DimensionMismatch`] if the query vector does not match the
/// index.
pub async fn retrieve<'a>(
    index: &'a Index,
    query: &str,
    k: usize,
    embedder: &dyn Embedder,
) -> Result<Vec<ScoredChunk<'a>>, RagError> {
    if index.is_empty() || query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embedder
        .embed(&[query.to_string()])
        .await
        .map_err(|e| RagError::upstream(Capability::Embedding, e))?
        .into_iter()
        .next()
        .ok_or(RagError::EmbeddingCount {
            expected: 1,
            actual: 0,
        })?;

    if let Some(dims) = index.dims().filter(|&d| d != query_vec.len()) {
        return Err(RagError::DimensionMismatch {
            expected: dims,
            actual: query_vec.len(),
        });
    }

    let ranked = rank_chunks(index, &query_vec, k);
    debug!(
        document = %index.key(),
        candidates = index.len(),
        returned = ranked.len(),
        top_score = ranked.first().map(|s| s.score),
        "retrieved chunks"
    );
    Ok(ranked)
}

/// Score every chunk against `query_vec` and keep the best `max(1, k)`.
pub fn rank_chunks<'a>(index: &'a Index, query_vec: &[f32], k: usize) -> Vec<ScoredChunk<'a>> {
    let mut scored: Vec<ScoredChunk<'a>> = index
        .chunks
        .iter()
        .map(|chunk| ScoredChunk {
            chunk,
            score: cosine_similarity(&chunk.embedding, query_vec),
        })
        .collect();

    // Stable: equal scores stay in chunk order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k.max(1));
    scored
}
