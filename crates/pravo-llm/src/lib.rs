//! Pravo-LLM: embedding gateway and chat-completion providers.
//!
//! This crate wraps remote embedding and chat models behind pluggable
//! traits, adds batching, retry with jittered backoff, chunking, and cost
//! metering, and selects model tiers by the `{quick, standard, deep}`
//! budget dial. Providers are injected through a factory bound to process
//! startup; tests substitute the deterministic fakes in [`testing`].

mod chunking;
mod embeddings;
mod gateway;
mod meter;
mod providers;
mod strategy;
pub mod testing;

pub use chunking::*;
pub use embeddings::*;
pub use gateway::*;
pub use meter::*;
pub use providers::*;
pub use strategy::*;

use pravo_core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Chat-completion provider abstraction.
///
/// Object-safe so the orchestrator can hold `Arc<dyn ChatProvider>`;
/// structured output is returned as raw JSON and parsed by the caller into
/// its strict shape (missing fields fail validation, they are never
/// defaulted).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generates plain text from a prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Generates a JSON object from a prompt. Implementations request JSON
    /// output mode where the model supports it.
    async fn generate_json(&self, prompt: &str) -> Result<Value>;

    /// Provider name for logs and the cost meter.
    fn provider_name(&self) -> &str;

    /// Model identifier in use.
    fn model_name(&self) -> &str;
}

/// Factory producing providers for a requested model tier.
///
/// The process owns exactly one factory; nothing reaches for a global
/// client. Tests hand the orchestrator a factory of fakes.
pub trait ProviderFactory: Send + Sync {
    /// A chat provider for the given strategy.
    fn chat(&self, strategy: &ModelStrategy) -> std::sync::Arc<dyn ChatProvider>;

    /// The embedding provider. One per process; the dimension is fixed.
    fn embedder(&self) -> std::sync::Arc<dyn EmbeddingProvider>;
}
