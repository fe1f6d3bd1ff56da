// Embeddings module
// Chunking of the extracted corpus and the seam to the hosted embedding model

pub mod chunking;

pub use chunking::{Chunk, ChunkingConfig, chunk_text};

/// Maps text to fixed-dimension vectors via a hosted embedding model.
///
/// Implementations must be deterministic per (model, text); that property is
/// assumed from the upstream model, not re-checked here. All stored vectors
/// and query vectors in one index must come from the same implementation.
pub trait TextEmbedder: Send + Sync {
    /// Identifier of the underlying model, recorded in the index fingerprint.
    fn model_id(&self) -> &str;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    fn embed_query(&self, text: &str) -> crate::Result<Vec<f32>>;
}
