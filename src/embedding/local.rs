//! Local embedding via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached; after
//! that, embeddings run offline. Inference is blocking and runs on tokio's
//! blocking pool.

use anyhow::{bail, Result};
use async_trait::async_trait;
use docchat_core::embedding::Embedder;
use std::sync::{Arc, Mutex};

use crate::config::EmbeddingConfig;

pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

impl LocalEmbedder {
    /// # Errors
    ///
    /// Returns an error if `embedding.model` is not a supported local model.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (_, dims) = local_model(&config.model)?;
        Ok(Self {
            model_name: config.model.clone(),
            dims,
            batch_size: config.batch_size,
            model: Arc::new(Mutex::new(None)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (fastembed_model, _) = local_model(&self.model_name)?;
        let slot = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut slot = slot
                .lock()
                .map_err(|_| anyhow::anyhow!("Local embedding model lock poisoned"))?;
            if slot.is_none() {
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
                )
                .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;
                *slot = Some(model);
            }
            let Some(model) = slot.as_mut() else {
                bail!("Local embedding model not initialized");
            };

            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

/// Map a config model name to the fastembed model and its dimensionality.
fn local_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel::*;
    match name {
        "all-minilm-l6-v2" => Ok((AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((BGEBaseENV15, 768)),
        "bge-large-en-v1.5" => Ok((BGELargeENV15, 1024)),
        "nomic-embed-text-v1.5" => Ok((NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Ok((MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((MultilingualE5Base, 768)),
        "multilingual-e5-large" => Ok((MultilingualE5Large, 1024)),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base, \
             multilingual-e5-large",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_dims() {
        let config = EmbeddingConfig {
            provider: "local".to_string(),
            model: "bge-base-en-v1.5".to_string(),
            ..EmbeddingConfig::default()
        };
        let embedder = LocalEmbedder::new(&config).unwrap();
        assert_eq!(embedder.dims(), 768);
    }

    #[test]
    fn test_remote_model_name_rejected() {
        let config = EmbeddingConfig {
            provider: "local".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(LocalEmbedder::new(&config).is_err());
    }
}
