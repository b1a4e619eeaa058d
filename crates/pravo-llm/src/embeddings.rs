//! Dense vector embeddings and the provider seam.

use async_trait::async_trait;
use pravo_core::{Error, Result};

/// A dense vector embedding of a text span.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector.
    pub vector: Vec<f32>,
}

impl Embedding {
    /// Creates an embedding from a raw vector.
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// Vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Cosine similarity with another embedding, in `[-1, 1]`.
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32> {
        if self.dimension() != other.dimension() {
            return Err(Error::InvariantViolated(format!(
                "dimension mismatch: {} vs {}",
                self.dimension(),
                other.dimension()
            )));
        }

        let dot: f32 = self
            .vector
            .iter()
            .zip(&other.vector)
            .map(|(a, b)| a * b)
            .sum();
        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (norm_a * norm_b))
    }

    /// Element-wise mean of a non-empty set of same-dimension embeddings.
    pub fn centroid(embeddings: &[Embedding]) -> Result<Embedding> {
        let first = embeddings
            .first()
            .ok_or_else(|| Error::invalid_argument("centroid of an empty set"))?;
        let dim = first.dimension();
        let mut acc = vec![0.0f32; dim];
        for e in embeddings {
            if e.dimension() != dim {
                return Err(Error::InvariantViolated(format!(
                    "dimension mismatch in centroid: {} vs {dim}",
                    e.dimension()
                )));
            }
            for (a, v) in acc.iter_mut().zip(&e.vector) {
                *a += v;
            }
        }
        let n = embeddings.len() as f32;
        for a in &mut acc {
            *a /= n;
        }
        Ok(Embedding::new(acc))
    }
}

/// Embedding provider abstraction.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embeds a batch, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// The fixed dimension this provider produces.
    fn dimension(&self) -> usize;

    /// Provider name for logs and the cost meter.
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identity() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let sim = a.cosine_similarity(&a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_cosine_dimension_mismatch_is_fatal() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0, 0.0]);
        let err = a.cosine_similarity(&b).unwrap_err();
        assert_eq!(err.code(), "INVARIANT_VIOLATED");
    }

    #[test]
    fn test_centroid_mean() {
        let c = Embedding::centroid(&[
            Embedding::new(vec![0.0, 2.0]),
            Embedding::new(vec![2.0, 0.0]),
        ])
        .unwrap();
        assert_eq!(c.vector, vec![1.0, 1.0]);
    }

    #[test]
    fn test_centroid_empty_is_invalid() {
        assert!(Embedding::centroid(&[]).is_err());
    }
}
