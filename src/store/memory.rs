//! Brute-force in-memory vector store.
//!
//! Chunks and their embeddings live in a `RwLock<Vec<_>>`; search is a
//! linear cosine scan. Good enough for one live document at a time, and
//! the whole index serializes to JSON, which is what the snapshot cache
//! persists and restores.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::error::StoreError;
use crate::store::cache::{CacheKey, SnapshotCache};
use crate::store::{ChunkMetadata, ScoredChunk, VectorStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    id: String,
    content: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// In-memory store over an [`Embedder`], with optional snapshot caching.
pub struct InMemoryStore {
    embedder: Arc<dyn Embedder>,
    chunks: RwLock<Vec<StoredChunk>>,
    cache: Option<Arc<SnapshotCache>>,
}

impl InMemoryStore {
    /// Create a store without snapshot caching.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(Vec::new()),
            cache: None,
        }
    }

    /// Create a store that can persist snapshots through `cache`.
    #[must_use]
    pub fn with_cache(embedder: Arc<dyn Embedder>, cache: Arc<SnapshotCache>) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(Vec::new()),
            cache: Some(cache),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn store_type(&self) -> &'static str {
        "in-memory"
    }

    async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<Vec<String>, StoreError> {
        if texts.len() != metadatas.len() {
            return Err(StoreError::Backend {
                message: format!(
                    "texts/metadatas length mismatch: {} vs {}",
                    texts.len(),
                    metadatas.len()
                ),
            });
        }
        let embeddings = self.embedder.embed(&texts).await?;
        let mut ids = Vec::with_capacity(texts.len());
        let mut chunks = self.chunks.write().await;
        for ((content, metadata), embedding) in texts.into_iter().zip(metadatas).zip(embeddings) {
            let id = Uuid::new_v4().to_string();
            ids.push(id.clone());
            chunks.push(StoredChunk {
                id,
                content,
                metadata,
                embedding,
            });
        }
        debug!(added = ids.len(), total = chunks.len(), "chunks inserted");
        Ok(ids)
    }

    async fn search_with_score(
        &self,
        query: &str,
        k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let query_embedding = self
            .embedder
            .embed(std::slice::from_ref(&query.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Embedding {
                message: "embedder returned no vector for query".to_string(),
            })?;
        let chunks = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| document_id.is_none_or(|id| c.metadata.document_id == id))
            .map(|c| ScoredChunk {
                content: c.content.clone(),
                metadata: c.metadata.clone(),
                score: cosine_similarity(&query_embedding, &c.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.read().await.len())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().await;
        let removed = chunks.len();
        chunks.clear();
        debug!(removed, "index cleared");
        Ok(())
    }

    fn supports_caching(&self) -> bool {
        self.cache.is_some()
    }

    async fn has_cache(&self, key: &CacheKey) -> bool {
        self.cache.as_ref().is_some_and(|c| c.has(key))
    }

    async fn load_from_cache(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let Some(cache) = self.cache.as_ref() else {
            return Ok(false);
        };
        let Some(path) = cache.snapshot_path(key) else {
            return Ok(false);
        };
        let raw = std::fs::read_to_string(&path)?;
        let restored: Vec<StoredChunk> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Snapshot {
                message: format!("corrupt snapshot {}: {e}", path.display()),
            })?;
        let count = restored.len();
        *self.chunks.write().await = restored;
        info!(%key, chunks = count, "index restored from snapshot");
        Ok(true)
    }

    async fn save_to_cache(&self, key: &CacheKey, source_url: &str) -> Result<bool, StoreError> {
        let Some(cache) = self.cache.as_ref() else {
            return Ok(false);
        };
        let serialized = {
            let chunks = self.chunks.read().await;
            serde_json::to_string(&*chunks)?
        };
        let temp = cache
            .directory()
            .join(format!("snapshot-{}.tmp", Uuid::new_v4()));
        std::fs::write(&temp, serialized)?;
        cache.store(key, &temp, source_url)?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(HashEmbedder::default()))
    }

    fn metadata(document_id: &str, chunk_index: usize, total: usize) -> ChunkMetadata {
        ChunkMetadata {
            document_id: document_id.to_string(),
            source: "https://example.com/doc.pdf".to_string(),
            chunk_index,
            total_chunks: total,
        }
    }

    #[tokio::test]
    async fn test_add_search_count_delete() {
        let store = store();
        store
            .add_documents(
                vec![
                    "the grace period for premium payment is thirty days".to_string(),
                    "quarterly revenue grew across all business segments".to_string(),
                ],
                vec![metadata("doc-1", 0, 2), metadata("doc-1", 1, 2)],
            )
            .await
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        assert_eq!(
            store.count().await.unwrap_or_else(|e| panic!("count failed: {e}")),
            2
        );

        let results = store
            .search_with_score("what is the grace period for premium payment", 1, None)
            .await
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("grace period"));

        store
            .delete_all()
            .await
            .unwrap_or_else(|e| panic!("delete failed: {e}"));
        assert_eq!(
            store.count().await.unwrap_or_else(|e| panic!("count failed: {e}")),
            0
        );
    }

    #[tokio::test]
    async fn test_search_respects_document_filter() {
        let store = store();
        store
            .add_documents(
                vec![
                    "alpha document content about insurance".to_string(),
                    "beta document content about insurance".to_string(),
                ],
                vec![metadata("doc-a", 0, 1), metadata("doc-b", 0, 1)],
            )
            .await
            .unwrap_or_else(|e| panic!("add failed: {e}"));

        let results = store
            .search_with_score("insurance content", 10, Some("doc-a"))
            .await
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.document_id, "doc-a");

        let unfiltered = store
            .search_with_score("insurance content", 10, None)
            .await
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert_eq!(unfiltered.len(), 2);
    }

    #[tokio::test]
    async fn test_results_sorted_by_score_and_truncated() {
        let store = store();
        let texts: Vec<String> = (0..5)
            .map(|i| format!("filler text number {i} with shared words"))
            .collect();
        let metas: Vec<ChunkMetadata> = (0..5).map(|i| metadata("doc-1", i, 5)).collect();
        store
            .add_documents(texts, metas)
            .await
            .unwrap_or_else(|e| panic!("add failed: {e}"));

        let results = store
            .search_with_score("shared words", 3, None)
            .await
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_cache() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let cache = Arc::new(
            SnapshotCache::open(dir.path()).unwrap_or_else(|e| panic!("cache open failed: {e}")),
        );
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        let key = CacheKey::for_document(
            "https://example.com/doc.pdf",
            crate::process::ProcessingVariant::Fast,
        );

        let source = InMemoryStore::with_cache(embedder.clone(), cache.clone());
        source
            .add_documents(
                vec!["the grace period is thirty days".to_string()],
                vec![metadata("doc-1", 0, 1)],
            )
            .await
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        assert!(source.supports_caching());
        assert!(
            source
                .save_to_cache(&key, "https://example.com/doc.pdf")
                .await
                .unwrap_or_else(|e| panic!("save failed: {e}"))
        );

        let fresh = InMemoryStore::with_cache(embedder, cache);
        assert!(fresh.has_cache(&key).await);
        assert!(
            fresh
                .load_from_cache(&key)
                .await
                .unwrap_or_else(|e| panic!("load failed: {e}"))
        );
        assert_eq!(
            fresh.count().await.unwrap_or_else(|e| panic!("count failed: {e}")),
            1
        );
        let results = fresh
            .search_with_score("grace period", 1, Some("doc-1"))
            .await
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert!(results[0].content.contains("thirty days"));
    }

    #[tokio::test]
    async fn test_load_from_cache_misses_cleanly() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let cache = Arc::new(
            SnapshotCache::open(dir.path()).unwrap_or_else(|e| panic!("cache open failed: {e}")),
        );
        let store = InMemoryStore::with_cache(Arc::new(HashEmbedder::default()), cache);
        let key = CacheKey::for_document(
            "https://example.com/never-cached.pdf",
            crate::process::ProcessingVariant::Fast,
        );
        assert!(!store.has_cache(&key).await);
        assert!(
            !store
                .load_from_cache(&key)
                .await
                .unwrap_or_else(|e| panic!("load failed: {e}"))
        );
    }
}
