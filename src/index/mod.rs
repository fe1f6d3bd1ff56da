// Vector index module
// LanceDB-backed storage and nearest-neighbor search over chunk embeddings

pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::embeddings::TextEmbedder;

pub use vector_store::{SearchHit, VectorStore};

/// Snapshot name used when the caller does not pick one. A later build under
/// the same name overwrites the earlier snapshot; there is no versioning.
pub const DEFAULT_SNAPSHOT_NAME: &str = "pdf_index";

/// A chunk and its embedding as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this row.
    pub id: String,
    /// The chunk text returned to the retriever.
    pub text: String,
    /// Display names of the documents the chunk came from.
    pub source: String,
    /// Position of the chunk within the corpus.
    pub ordinal: u32,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Identity of the embedder a snapshot was built with, written next to the
/// snapshot and validated on load. Querying with an incompatible embedder
/// would return meaningless similarity scores, so a mismatch fails fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub model_id: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub built_at: String,
}

impl IndexFingerprint {
    #[inline]
    pub fn for_embedder(embedder: &dyn TextEmbedder, chunk_count: usize) -> Self {
        Self {
            model_id: embedder.model_id().to_string(),
            dimension: embedder.dimension(),
            chunk_count,
            built_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether a snapshot built with this fingerprint can be queried through
    /// the given embedder.
    #[inline]
    pub fn compatible_with(&self, embedder: &dyn TextEmbedder) -> bool {
        self.model_id == embedder.model_id() && self.dimension == embedder.dimension()
    }
}
