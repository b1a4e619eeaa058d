//! Deterministic fakes for tests.
//!
//! The fakes honor the same contracts as the real providers so suites run
//! hermetically: the embedder derives a stable vector from the text bytes,
//! and the chat fake replays canned responses in order.

use crate::{ChatProvider, Embedding, EmbeddingProvider, ModelStrategy, ProviderFactory};
use async_trait::async_trait;
use pravo_core::{Error, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Embedding fake: a stable pseudo-vector per input text.
pub struct FakeEmbedder {
    dimension: usize,
    claimed_dimension: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            claimed_dimension: dimension,
        }
    }

    /// Makes `dimension()` report a different value than the vectors carry,
    /// to exercise the gateway's invariant check.
    pub fn with_claimed_dimension(mut self, claimed: usize) -> Self {
        self.claimed_dimension = claimed;
        self
    }

    /// The vector this fake produces for `text`.
    pub fn deterministic(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, b) in text.bytes().enumerate() {
            vector[i % self.dimension] += (b as f32) / 255.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Embedding::new(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.deterministic(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.deterministic(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.claimed_dimension
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

/// Chat fake: replays queued responses, then errors.
pub struct FakeChatModel {
    responses: Mutex<Vec<Value>>,
    delay: Mutex<Option<std::time::Duration>>,
    /// Prompts the fake has seen, for assertions.
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChatModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queues a JSON response (served FIFO).
    pub fn push_response(&self, response: Value) {
        self.responses.lock().unwrap().push(response);
    }

    /// Adds artificial latency to every call, for deadline tests.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

impl Default for FakeChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for FakeChatModel {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let value = self.generate_json(prompt).await?;
        Ok(match value {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::Unavailable("fake chat model has no queued response".into()));
        }
        Ok(responses.remove(0))
    }

    fn provider_name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-chat"
    }
}

/// Factory of fakes, sharing one chat fake so tests can queue responses and
/// inspect prompts.
pub struct FakeProviderFactory {
    pub chat: Arc<FakeChatModel>,
    pub embedder: Arc<FakeEmbedder>,
}

impl FakeProviderFactory {
    pub fn new(dimension: usize) -> Self {
        Self {
            chat: Arc::new(FakeChatModel::new()),
            embedder: Arc::new(FakeEmbedder::new(dimension)),
        }
    }
}

impl ProviderFactory for FakeProviderFactory {
    fn chat(&self, _strategy: &ModelStrategy) -> Arc<dyn ChatProvider> {
        self.chat.clone()
    }

    fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }
}
