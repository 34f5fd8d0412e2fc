//! Text embedding backends and the batch pass over assembled records.

use anyhow::Result;

use crate::normalization::movie::MovieRecord;

pub mod local;
pub mod openai;

pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

/// Dimension of all-MiniLM-L6-v2, the model the `movies.embedding` column is sized for.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Text → fixed-length vector model. Loaded once per process.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier used in logs.
    fn model_name(&self) -> &str;

    /// Vector length this embedder promises, if known up front.
    fn dimension(&self) -> Option<usize>;

    /// Embed `texts`; output `i` belongs to input `i`. Empty input yields an
    /// empty output.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Embed every record's summary in one batch call and attach the vectors.
///
/// Fails when the model returns the wrong number of vectors, when vector
/// lengths differ within the batch, or when they differ from the declared
/// dimension. Records are left untouched on failure.
pub async fn embed_records(
    embedder: &dyn Embedder,
    records: &mut [MovieRecord],
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    let texts: Vec<&str> = records.iter().map(|r| r.summary_text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    let dim = check_batch(&vectors, texts.len(), embedder.dimension())?;
    for (record, vector) in records.iter_mut().zip(vectors) {
        record.embedding = vector;
    }
    Ok(dim)
}

fn check_batch(
    vectors: &[Vec<f32>],
    expected_len: usize,
    declared: Option<usize>,
) -> Result<usize> {
    anyhow::ensure!(
        vectors.len() == expected_len,
        "embedder returned {} vectors for {} inputs",
        vectors.len(),
        expected_len
    );
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    anyhow::ensure!(dim > 0, "embedder returned empty vectors");
    if let Some(pos) = vectors.iter().position(|v| v.len() != dim) {
        anyhow::bail!(
            "embedding {pos} has length {} but the batch uses {dim}",
            vectors[pos].len()
        );
    }
    if let Some(declared) = declared {
        anyhow::ensure!(
            dim == declared,
            "embedding length {dim} does not match configured dimension {declared}"
        );
    }
    Ok(dim)
}
