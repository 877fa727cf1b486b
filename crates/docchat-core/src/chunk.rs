//! Sliding-window text chunker.
//!
//! Splits raw document text into fixed-size, overlapping [`Chunk`]s with
//! stable character offsets. Consecutive chunks share exactly
//! `overlap_chars` characters so that a passage straddling a boundary is
//! fully contained in at least one chunk.
//!
//! # Algorithm
//!
//! 1. Clamp `target_chars` to `>= 1` and `overlap_chars` to
//!    `[0, target_chars - 1]`; `step = target_chars - overlap_chars`.
//! 2. Starting at offset 0, emit `[start, min(len, start + target_chars))`.
//! 3. Stop when a chunk reaches the end of the text or `max_chunks`
//!    chunks have been emitted; otherwise advance `start += step`.
//!
//! Offsets count Unicode scalar values, so a chunk never splits a UTF-8
//! sequence.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::{chunk_text, ChunkingParams};
//!
//! let params = ChunkingParams { target_chars: 4, overlap_chars: 1, max_chunks: 100 };
//! let chunks = chunk_text("abcdefghij", &params);
//! let spans: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
//! assert_eq!(spans, vec![(0, 4), (3, 7), (6, 10)]);
//! assert_eq!(chunks[1].id, "c1");
//! ```

use serde::{Deserialize, Serialize};

use crate::models::Chunk;

/// Chunker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    /// Characters per chunk.
    pub target_chars: usize,
    /// Characters shared by consecutive chunks.
    pub overlap_chars: usize,
    /// Upper bound on emitted chunks.
    pub max_chunks: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            target_chars: 1800,
            overlap_chars: 200,
            max_chunks: 10_000,
        }
    }
}

impl ChunkingParams {
    /// `(target, overlap, step)` after clamping.
    fn normalized(&self) -> (usize, usize, usize) {
        let target = self.target_chars.max(1);
        let overlap = self.overlap_chars.min(target - 1);
        (target, overlap, target - overlap)
    }
}

/// Split `text` into overlapping chunks.
///
/// # Guarantees
///
/// - Empty text, or `max_chunks == 0`, yields no chunks.
/// - Chunks cover `[0, len)` without gaps unless the `max_chunks` cap is hit.
/// - Ids are `c0, c1, …` in offset order.
/// - `chunks[i].end - chunks[i + 1].start == overlap` for every consecutive
///   pair (after clamping).
pub fn chunk_text(text: &str, params: &ChunkingParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    if text.is_empty() || params.max_chunks == 0 {
        return chunks;
    }

    let (target, _, step) = params.normalized();

    // Byte position of every char, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut start = 0usize;
    while start < len && chunks.len() < params.max_chunks {
        let end = len.min(start + target);
        chunks.push(Chunk {
            id: format!("c{}", chunks.len()),
            text: text[bounds[start]..bounds[end]].to_string(),
            start,
            end,
        });
        if end >= len {
            break;
        }
        start += step;
    }

    chunks
}
