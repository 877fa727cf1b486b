//! Versioned index cache.
//!
//! Maps a [`DocumentKey`] (`document_id`, `version`) to a fully built
//! [`Index`]. A new version is an unrelated key and always triggers a full
//! rebuild, so embeddings computed against a stale body are never served.
//!
//! # Concurrency
//!
//! - Lookups and inserts go through a bounded LRU behind a mutex.
//! - Builds for the same key are serialized by a per-key async gate: the
//!   first caller builds, later callers wait and then find the published
//!   index. Builds for different keys run concurrently.
//! - An index is inserted only once it is complete. In-progress builds are
//!   not in the LRU, so eviction can never affect them.
//! - A failed build publishes nothing; waiting callers then attempt their
//!   own build.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::chunk::{chunk_text, ChunkingParams};
use crate::embedding::{embed_batched, Embedder, DEFAULT_BATCH_SIZE};
use crate::error::RagError;
use crate::models::{DocumentKey, EmbeddedChunk, Index};

/// Default number of document versions kept.
pub const DEFAULT_CAPACITY: usize = 64;

type Gate = Arc<AsyncMutex<()>>;

/// Process-wide cache of built indexes.
pub struct IndexCache {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingParams,
    batch_size: usize,
    entries: Mutex<LruCache<DocumentKey, Arc<Index>>>,
    gates: Mutex<HashMap<DocumentKey, Gate>>,
}

impl IndexCache {
    pub fn new(embedder: Arc<dyn Embedder>, capacity: NonZeroUsize) -> Self {
        Self {
            embedder,
            chunking: ChunkingParams::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            entries: Mutex::new(LruCache::new(capacity)),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingParams) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Number of cached document versions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached index for `key`, if any. Counts as a use for LRU purposes.
    pub fn get(&self, key: &DocumentKey) -> Option<Arc<Index>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.entries.lock().contains(key)
    }

    /// Return the index for `(document_id, version)`, building it from `text`
    /// on a miss.
    ///
    /// A hit returns the cached instance without re-embedding. `text` is
    /// only read on a miss.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures from the build; nothing is cached then.
    pub async fn build_or_load(
        &self,
        document_id: &str,
        version: &str,
        text: &str,
    ) -> Result<Arc<Index>, RagError> {
        let key = DocumentKey::new(document_id, version);
        if let Some(index) = self.get(&key) {
            debug!(document = %key, "index cache hit");
            return Ok(index);
        }

        let lease = GateLease::acquire(&self.gates, key.clone());
        let _building = lease.gate().lock().await;

        // Another caller may have finished while we waited.
        if let Some(index) = self.get(&key) {
            debug!(document = %key, "index built by concurrent request");
            return Ok(index);
        }

        let index = Arc::new(self.build(&key, text).await?);
        self.entries.lock().put(key, Arc::clone(&index));
        Ok(index)
    }

    async fn build(&self, key: &DocumentKey, text: &str) -> Result<Index, RagError> {
        let chunks = chunk_text(text, &self.chunking);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_batched(self.embedder.as_ref(), &texts, self.batch_size).await?;

        let chunks: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        info!(
            document = %key,
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "built index"
        );

        Ok(Index {
            document_id: key.document_id.clone(),
            version: key.version.clone(),
            chunks,
        })
    }
}

/// Shared handle on a per-key build gate.
///
/// Every clone and drop of a gate happens under the `gates` lock, so the last
/// lease to go away can tell it is the last one and remove the entry. This
/// also holds when the owning future is cancelled.
struct GateLease<'a> {
    gates: &'a Mutex<HashMap<DocumentKey, Gate>>,
    key: DocumentKey,
    gate: Option<Gate>,
}

impl<'a> GateLease<'a> {
    fn acquire(gates: &'a Mutex<HashMap<DocumentKey, Gate>>, key: DocumentKey) -> Self {
        let gate = Arc::clone(gates.lock().entry(key.clone()).or_default());
        Self {
            gates,
            key,
            gate: Some(gate),
        }
    }

    fn gate(&self) -> &AsyncMutex<()> {
        match &self.gate {
            Some(gate) => gate,
            None => unreachable!("gate is only taken on drop"),
        }
    }
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock();
        drop(self.gate.take());
        if gates
            .get(&self.key)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            gates.remove(&self.key);
        }
    }
}
