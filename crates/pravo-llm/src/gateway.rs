//! The embedding gateway: batching, retry, dimension enforcement, and cost
//! metering in front of a raw [`EmbeddingProvider`].

use crate::{
    estimate_tokens, ChunkingConfig, CostMeter, Embedding, EmbeddingProvider,
    split_for_embedding,
};
use pravo_core::{retry_with_backoff, Error, Result, RetryPolicy};
use std::sync::Arc;
use tracing::debug;

/// Maximum inputs coalesced into one upstream batch call.
const MAX_BATCH: usize = 96;

/// Wraps a provider with the behavior every embedding consumer relies on.
///
/// A returned vector of the wrong dimension is `INVARIANT_VIOLATED` and is
/// never truncated or padded.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    chunking: ChunkingConfig,
    meter: Arc<CostMeter>,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, meter: Arc<CostMeter>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            chunking: ChunkingConfig::default(),
            meter,
        }
    }

    /// Overrides the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The fixed dimension `D`.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Splits a text into embeddable chunks.
    pub fn split_for_embedding(&self, text: &str) -> Vec<String> {
        split_for_embedding(text, &self.chunking)
    }

    /// Embeds one text.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch
            .pop()
            .ok_or_else(|| Error::Unavailable("provider returned no embedding".into()))
    }

    /// Embeds a batch, preserving input order. Inputs beyond the provider's
    /// batch ceiling are coalesced into successive calls.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for window in texts.chunks(MAX_BATCH) {
            let embeddings = retry_with_backoff(&self.retry, "embed_batch", || {
                self.provider.embed_batch(window)
            })
            .await?;

            for embedding in &embeddings {
                self.check_dimension(embedding)?;
            }
            let tokens: u64 = window.iter().map(|t| estimate_tokens(t)).sum();
            self.meter.record(self.provider.provider_name(), tokens, 0);
            debug!(
                count = window.len(),
                tokens,
                "embedded batch"
            );
            out.extend(embeddings);
        }
        Ok(out)
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<()> {
        let expected = self.provider.dimension();
        if embedding.dimension() != expected {
            return Err(Error::InvariantViolated(format!(
                "embedding dimension {} != configured {expected}",
                embedding.dimension()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbedder;

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let gateway = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(8)), Arc::new(CostMeter::new()));
        let texts: Vec<String> = (0..5).map(|i| format!("текст {i}")).collect();
        let out = gateway.embed_batch(&texts).await.unwrap();
        assert_eq!(out.len(), 5);
        for (text, embedding) in texts.iter().zip(&out) {
            assert_eq!(embedding, &FakeEmbedder::new(8).deterministic(text));
        }
    }

    #[tokio::test]
    async fn test_large_batch_coalesces() {
        let gateway = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(8)), Arc::new(CostMeter::new()));
        let texts: Vec<String> = (0..MAX_BATCH + 10).map(|i| format!("т{i}")).collect();
        let out = gateway.embed_batch(&texts).await.unwrap();
        assert_eq!(out.len(), MAX_BATCH + 10);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_fatal() {
        let embedder = FakeEmbedder::new(8).with_claimed_dimension(16);
        let gateway = EmbeddingGateway::new(Arc::new(embedder), Arc::new(CostMeter::new()));
        let err = gateway.embed("текст").await.unwrap_err();
        assert_eq!(err.code(), "INVARIANT_VIOLATED");
    }

    #[tokio::test]
    async fn test_meter_records_usage() {
        let meter = Arc::new(CostMeter::new());
        let gateway = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(8)), meter.clone());
        gateway.embed("довгий текст запиту").await.unwrap();
        assert_eq!(meter.snapshot().calls, 1);
        assert!(meter.snapshot().input_tokens > 0);
    }
}
