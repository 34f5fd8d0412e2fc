use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::info;

use super::Embedder;

/// Local sentence-transformer embeddings through fastembed (ONNX runtime).
pub struct LocalEmbedder {
    name: String,
    dim: usize,
    // fastembed needs exclusive access while embedding.
    model: Mutex<TextEmbedding>,
}

/// Map a configured model name to a fastembed model and its vector length.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let normalized = name
        .trim()
        .trim_start_matches("sentence-transformers/")
        .to_ascii_lowercase();
    match normalized.as_str() {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "all-minilm-l12-v2" => Ok((EmbeddingModel::AllMiniLML12V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => Err(anyhow!("unsupported local embedding model {other:?}")),
    }
}

impl LocalEmbedder {
    pub const DEFAULT_MODEL: &'static str = "all-MiniLM-L6-v2";

    /// Load (downloading on first use) the named model. Slow; call once.
    pub fn load(name: &str) -> Result<Self> {
        let (model, dim) = resolve_model(name)?;
        info!(model = name, dim, "loading local embedding model");
        let options = TextInitOptions::new(model).with_show_download_progress(false);
        let instance = TextEmbedding::try_new(options)
            .with_context(|| format!("failed to load embedding model {name}"))?;
        Ok(Self {
            name: name.to_string(),
            dim,
            model: Mutex::new(instance),
        })
    }
}

#[async_trait::async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dim)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("embedding model lock poisoned"))?;
        model
            .embed(texts.to_vec(), None)
            .context("local embedding batch failed")
    }
}
