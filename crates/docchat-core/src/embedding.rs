//! Embedding capability trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that embedding backends implement, the
//! order-preserving batching wrapper [`embed_batched`], and
//! [`cosine_similarity`].
//!
//! Concrete providers (OpenAI, Ollama, local fastembed) live in the `docchat`
//! application crate.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::{Capability, RagError};

/// Default number of texts sent per embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// A batch text-embedding capability.
///
/// `embed` must return one vector per input, in input order, all of the
/// same dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-large"`).
    fn model_name(&self) -> &str;
    /// Returns the expected vector dimensionality (e.g. `3072`), or `0` when
    /// the provider does not know it in advance.
    fn dims(&self) -> usize;
    /// Embed one batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed `texts` in consecutive batches of at most `batch_size`.
///
/// Order is preserved across batches. A failed batch aborts the whole call
/// with [`RagError::Upstream`]; nothing is retried here.
///
/// # Errors
///
/// - [`RagError::Upstream`] when the embedder fails.
/// - [`RagError::EmbeddingCount`] when a batch returns the wrong number of vectors.
/// - [`RagError::DimensionMismatch`] when a vector's length differs from
///   [`Embedder::dims`], or from the first vector if `dims()` is `0`.
pub async fn embed_batched(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    let batch_size = batch_size.max(1);
    let mut out: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

    for (i, batch) in texts.chunks(batch_size).enumerate() {
        debug!(
            model = embedder.model_name(),
            batch = i,
            size = batch.len(),
            "embedding batch"
        );
        let vectors = embedder
            .embed(batch)
            .await
            .map_err(|e| RagError::upstream(Capability::Embedding, e))?;

        if vectors.len() != batch.len() {
            return Err(RagError::EmbeddingCount {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }
        out.extend(vectors);
    }

    // A provider that reports `dims() == 0` is checked for consistency only.
    let expected = match embedder.dims() {
        0 => out.first().map(Vec::len),
        dims => Some(dims),
    };
    if let Some(dims) = expected {
        if let Some(bad) = out.iter().find(|v| v.len() != dims) {
            return Err(RagError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }
    }

    Ok(out)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// When either norm is zero the denominator is floored to `1.0`, which
/// yields `0.0` rather than NaN. Vectors of different lengths, or with
/// non-finite components, score `0.0`.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let mut denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        denom = 1.0;
    }

    let sim = dot / denom;
    // Also folds -0.0 into 0.0 so ties compare equal under `total_cmp`.
    if !sim.is_finite() || sim == 0.0 {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0)
}
