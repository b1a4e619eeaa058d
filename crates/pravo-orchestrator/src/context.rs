//! The execution context handed to every tool handler.

use lru::LruCache;
use pravo_core::Result;
use pravo_ingest::{IngestWorker, ScrapeWorker};
use pravo_legislation::LegislationService;
use pravo_llm::{CostMeter, EmbeddingGateway, ProviderFactory};
use pravo_patterns::PatternStore;
use pravo_sources::UploadParser;
use pravo_store::{MetaStore, VectorStore};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Per-process cache width for query embeddings.
const EMBEDDING_CACHE_SIZE: usize = 256;

/// Everything a tool handler may touch. Assembled once at startup; the
/// orchestrator itself is stateless across requests.
#[derive(Clone)]
pub struct ToolContext {
    pub meta: Arc<dyn MetaStore>,
    pub vectors: Arc<dyn VectorStore>,
    pub gateway: Arc<EmbeddingGateway>,
    pub providers: Arc<dyn ProviderFactory>,
    pub legislation: Arc<LegislationService>,
    pub patterns: Arc<PatternStore>,
    pub ingest: Arc<IngestWorker>,
    pub scraper: Arc<ScrapeWorker>,
    pub upload: Arc<UploadParser>,
    pub meter: Arc<CostMeter>,
    /// The caller on whose behalf document reads run; `None` sees only
    /// public documents.
    pub viewer: Option<Uuid>,
    /// Effective deadline applied to every tool invocation.
    pub deadline: Duration,
    /// How many top cases get full-section expansion by default.
    pub expansion_top_k: usize,
    /// Per-source latency cap inside parallel evidence collection.
    pub evidence_timeout: Duration,
    /// Query-embedding cache; the parallel evidence sources embed the same
    /// query, only the first pays for it.
    embedding_cache: Arc<Mutex<LruCache<String, Vec<f32>>>>,
}

impl ToolContext {
    /// Context with the default operational knobs.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: Arc<dyn MetaStore>,
        vectors: Arc<dyn VectorStore>,
        gateway: Arc<EmbeddingGateway>,
        providers: Arc<dyn ProviderFactory>,
        legislation: Arc<LegislationService>,
        patterns: Arc<PatternStore>,
        ingest: Arc<IngestWorker>,
        scraper: Arc<ScrapeWorker>,
        upload: Arc<UploadParser>,
        meter: Arc<CostMeter>,
    ) -> Self {
        Self {
            meta,
            vectors,
            gateway,
            providers,
            legislation,
            patterns,
            ingest,
            scraper,
            upload,
            meter,
            viewer: None,
            deadline: Duration::from_secs(60),
            expansion_top_k: 3,
            evidence_timeout: Duration::from_secs(15),
            embedding_cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(EMBEDDING_CACHE_SIZE).expect("non-zero cache size"),
            ))),
        }
    }

    /// Embeds a query through the per-process cache.
    pub async fn embed_cached(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.embedding_cache.lock().expect("cache lock").get(text) {
            return Ok(vector.clone());
        }
        let embedding = self.gateway.embed(text).await?;
        self.embedding_cache
            .lock()
            .expect("cache lock")
            .put(text.to_string(), embedding.vector.clone());
        Ok(embedding.vector)
    }

    /// Restricts reads to one caller's view.
    pub fn with_viewer(mut self, viewer: Uuid) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// Overrides the per-tool deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}
