//! Vector index abstraction for knowledge chunks.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use concierge_core::AppResult;

/// Trait for vector index backends.
///
/// One index holds one collection. Methods take `&self` so a collection can
/// be searched from concurrent requests; backends handle their own locking.
pub trait VectorIndex: Send + Sync {
    /// Record a source document.
    fn upsert_source(&self, source: &KnowledgeSource) -> AppResult<()>;

    /// Insert or update a chunk with its embedding.
    fn upsert_chunk(&self, chunk: &KnowledgeChunk) -> AppResult<()>;

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks with their cosine similarity, highest first.
    fn search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<(KnowledgeChunk, f32)>>;

    /// Returns (sources_count, chunks_count).
    fn stats(&self) -> AppResult<(u64, u64)>;

    /// Remove all chunks and sources.
    fn reset(&self) -> AppResult<()>;
}
