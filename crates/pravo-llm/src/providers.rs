//! Remote provider implementations (OpenAI-compatible wire shape).

use crate::{ChatProvider, Embedding, EmbeddingProvider, ModelStrategy, ProviderFactory};
use async_trait::async_trait;
use anyhow::Context;
use pravo_core::{classify_status, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    supports_json: bool,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    /// Creates a client for the given strategy.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, strategy: &ModelStrategy) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: strategy.model.clone(),
            max_tokens: strategy.max_tokens,
            supports_json: strategy.supports_json,
            client: reqwest::Client::new(),
        }
    }

    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: 0.2,
            response_format: (json_mode && self.supports_json)
                .then(|| ResponseFormat { format_type: "json_object".to_string() }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("chat response decode failed: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Unavailable("chat response had no choices".into()))
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl ChatProvider for OpenAiChatClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, false).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value> {
        let raw = self.complete(prompt, true).await?;
        // Models occasionally wrap JSON in a code fence even in JSON mode.
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let preview: String = raw.chars().take(200).collect();
        serde_json::from_str(trimmed)
            .with_context(|| format!("model returned non-JSON output: {preview}"))
            .map_err(Error::Internal)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embedding client for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| Error::Unavailable("embedding response was empty".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("embedding response decode failed: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::Unavailable(format!(
                "embedding response had {} items for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        // The API documents order preservation; sort by index anyway so the
        // batch contract holds regardless.
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| Embedding::new(d.embedding)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Factory over one OpenAI-compatible deployment. Bound to process startup;
/// nothing else constructs provider clients.
pub struct OpenAiProviderFactory {
    api_key: String,
    base_url: String,
    embedding_model: String,
    dimension: usize,
}

impl OpenAiProviderFactory {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            embedding_model: embedding_model.into(),
            dimension,
        }
    }
}

impl ProviderFactory for OpenAiProviderFactory {
    fn chat(&self, strategy: &ModelStrategy) -> Arc<dyn ChatProvider> {
        Arc::new(OpenAiChatClient::new(
            self.api_key.clone(),
            self.base_url.clone(),
            strategy,
        ))
    }

    fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::new(OpenAiEmbeddingClient::new(
            self.api_key.clone(),
            self.base_url.clone(),
            self.embedding_model.clone(),
            self.dimension,
        ))
    }
}
