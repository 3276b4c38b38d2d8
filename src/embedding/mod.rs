//! Text embedding abstraction.
//!
//! The vector store talks to an [`Embedder`] trait object so that any
//! embedding backend can be plugged in. The built-in [`HashEmbedder`] maps
//! tokens to signed dimensions via SHA-256, which is deterministic, needs no
//! network or model files, and still yields meaningful cosine overlap for
//! texts that share vocabulary.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// Default dimensionality for the hash embedder.
pub const DEFAULT_DIMENSION: usize = 384;

/// Contract for turning text into fixed-size vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts. Output length and order match the input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError>;
}

/// Deterministic bag-of-tokens embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256; the hash picks
/// a dimension and a sign, and the token contributes ±1 there. The final
/// vector is L2-normalized so dot products are cosine similarities.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder with the given dimensionality.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&digest[..8]);
            let hash = u64::from_be_bytes(raw);
            let index = usize::try_from(hash % self.dimension as u64).unwrap_or(0);
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
