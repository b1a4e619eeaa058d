//! The Pravo MCP server binary.
//!
//! Wires the real stack: Postgres metadata store, Qdrant vector store,
//! OpenAI-compatible providers, the court-decisions client and legislation
//! scraper, the ingest and scrape workers, the orchestrator, and the SSE
//! endpoint. Configuration comes from the environment; shutdown is
//! graceful on SIGINT.

use pravo_core::AppConfig;
use pravo_ingest::{IngestWorker, ScrapeWorker, Sectionizer};
use pravo_legislation::LegislationService;
use pravo_llm::{select_strategy, CostMeter, EmbeddingGateway, OpenAiProviderFactory, ProviderFactory};
use pravo_mcp::{router, AuthConfig, McpServer};
use pravo_orchestrator::{Orchestrator, ToolContext};
use pravo_patterns::PatternStore;
use pravo_sources::{CourtClient, FetchCache, LegislationFetcher, UploadParser};
use pravo_store::{PgMetadataStore, QdrantStore, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(host = %config.host, port = config.port, "starting pravo-mcp");

    // Stores.
    let meta = Arc::new(PgMetadataStore::connect(&config.database_url).await?);
    meta.migrate().await?;
    let vectors = Arc::new(QdrantStore::connect(
        &config.qdrant_url,
        config.collection.clone(),
        config.embedding_dimension,
    )?);
    vectors.ensure_collection().await?;

    // Providers.
    let meter = Arc::new(CostMeter::new());
    let providers: Arc<dyn ProviderFactory> = Arc::new(OpenAiProviderFactory::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
    ));
    let gateway = Arc::new(EmbeddingGateway::new(providers.embedder(), meter.clone()));

    // Source adapters.
    let rate_limit = Duration::from_millis(config.court_rate_limit_ms);
    let court = Arc::new(CourtClient::new(
        config.court_api_base.clone(),
        config.court_api_token.clone(),
        rate_limit,
    ));
    let legislation_cache = FetchCache::open(&config.cache_dir).await?;
    let fetcher = Arc::new(
        LegislationFetcher::new(config.legislation_base.clone(), rate_limit)
            .with_cache(legislation_cache),
    );
    let upload = Arc::new(UploadParser::new());

    // Services and workers.
    let legislation = Arc::new(LegislationService::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        fetcher,
    ));
    let patterns = Arc::new(PatternStore::new(meta.clone(), gateway.clone()));
    let assist = providers.chat(&select_strategy(pravo_core::Budget::Quick));
    let ingest = Arc::new(IngestWorker::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        court.clone(),
        Sectionizer::new().with_assist(assist),
        config.ingest_concurrency,
    ));
    let scraper = Arc::new(ScrapeWorker::new(court, ingest.clone()));

    // Orchestrator and endpoint.
    let ctx = ToolContext::new(
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
    )
    .with_deadline(Duration::from_secs(config.tool_deadline_secs));
    let orchestrator = Arc::new(Orchestrator::new(ctx));

    let state = Arc::new(McpServer::new(
        orchestrator,
        AuthConfig {
            api_key: config.mcp_api_key.clone(),
            bearer_secret: config.mcp_bearer_secret.clone(),
        },
    ));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
