//! Vector store contract and implementations.
//!
//! The orchestration core only ever sees `Arc<dyn VectorStore>`. The crate
//! ships a brute-force in-memory implementation ([`memory::InMemoryStore`])
//! with optional snapshot caching ([`cache::SnapshotCache`]); remote
//! backends with eventual consistency are accommodated through the polling
//! helpers in [`consistency`].

pub mod cache;
pub mod consistency;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use cache::CacheKey;

/// Metadata attached to every stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Identifier of the document this chunk belongs to.
    pub document_id: String,
    /// Source URL of the document.
    pub source: String,
    /// Zero-based position of this chunk within the document.
    pub chunk_index: usize,
    /// Total number of chunks produced for the document.
    pub total_chunks: usize,
}

/// A chunk returned from a similarity search, with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// The chunk text.
    pub content: String,
    /// Chunk provenance.
    pub metadata: ChunkMetadata,
    /// Cosine similarity in `[-1, 1]`; higher is more similar.
    pub score: f32,
}

/// Contract every vector store backend implements.
///
/// The caching hooks default to no-ops; backends that can snapshot their
/// state override them and report `supports_caching() == true`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs.
    fn store_type(&self) -> &'static str;

    /// Embed and insert a batch of chunks. Returns the assigned chunk ids.
    async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<Vec<String>, StoreError>;

    /// Top-`k` similarity search, optionally filtered to one document id.
    async fn search_with_score(
        &self,
        query: &str,
        k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Number of chunks currently live in the index.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Remove every chunk from the index.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Whether this backend can persist and restore snapshots.
    fn supports_caching(&self) -> bool {
        false
    }

    /// Whether a snapshot exists for `key`.
    async fn has_cache(&self, key: &CacheKey) -> bool {
        let _ = key;
        false
    }

    /// Replace the live index with the snapshot for `key`.
    /// Returns `false` when no snapshot exists.
    async fn load_from_cache(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let _ = key;
        Ok(false)
    }

    /// Persist the live index as the snapshot for `key`.
    /// Returns `false` when this backend does not cache.
    async fn save_to_cache(&self, key: &CacheKey, source_url: &str) -> Result<bool, StoreError> {
        let _ = (key, source_url);
        Ok(false)
    }
}
