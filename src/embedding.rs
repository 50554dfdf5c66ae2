//! Text embedding
//!
//! The model maps text into the same space as the stored vectors. It is
//! created once per process and shared by every request.

use async_trait::async_trait;

use crate::types::Vector;
use crate::{Error, Result};

#[cfg(feature = "candle")]
pub mod candle;

/// Embedding model trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier
    fn model_name(&self) -> &str;

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Encode text. Output is not normalized.
    async fn encode(&self, text: &str) -> Result<Vector>;
}

/// Deterministic signed feature-hashing embedder.
///
/// Each lowercased alphanumeric token adds ±1 to one bucket chosen by its
/// hash. Texts sharing vocabulary land close together under cosine
/// similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    name: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        Self::named("hashing", dimension)
    }

    pub fn named(name: impl Into<String>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Embedding(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            dimension,
        })
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vector> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            let hash = seahash::hash(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            // Top bit picks the sign so collisions tend to cancel
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        Ok(vector)
    }
}
