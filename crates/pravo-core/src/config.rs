//! Environment-driven configuration.

use std::env;

/// Process-wide configuration, loaded once at startup and passed down by
/// reference. Tests construct it directly instead of reading the
/// environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host address the MCP endpoint binds to.
    pub host: String,
    /// Port the MCP endpoint binds to.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Postgres connection string for the metadata store.
    pub database_url: String,
    /// Qdrant endpoint for the vector store.
    pub qdrant_url: String,
    /// Vector collection name.
    pub collection: String,
    /// Fixed embedding dimension `D`. A vector of any other length is
    /// rejected, never truncated.
    pub embedding_dimension: usize,
    /// Base URL of the court-decisions search API.
    pub court_api_base: String,
    /// App token for the court-decisions API (`X-App-Token`).
    pub court_api_token: String,
    /// Minimum interval between court-API calls, in milliseconds.
    pub court_rate_limit_ms: u64,
    /// Base URL of the legislation source.
    pub legislation_base: String,
    /// OpenAI-compatible provider base URL.
    pub llm_base_url: String,
    /// Provider API key.
    pub llm_api_key: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Ingest semaphore width.
    pub ingest_concurrency: usize,
    /// Directory for adapter fetch caches.
    pub cache_dir: String,
    /// API key accepted by the MCP endpoint (`X-Api-Key`).
    pub mcp_api_key: Option<String>,
    /// Secret used to verify bearer-token claims on the MCP endpoint.
    pub mcp_bearer_secret: Option<String>,
    /// Default per-tool deadline in seconds.
    pub tool_deadline_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            log_level: "info".to_string(),
            database_url: "postgres://localhost/pravo".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "legal_sections".to_string(),
            embedding_dimension: 1536,
            court_api_base: "https://court.searcher.api".to_string(),
            court_api_token: String::new(),
            court_rate_limit_ms: 200,
            legislation_base: "https://zakon.rada.gov.ua".to_string(),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: String::new(),
            embedding_model: "text-embedding-3-small".to_string(),
            ingest_concurrency: 10,
            cache_dir: ".pravo-cache".to_string(),
            mcp_api_key: None,
            mcp_bearer_secret: None,
            tool_deadline_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("PRAVO_HOST", defaults.host),
            port: env_parsed("PRAVO_PORT", defaults.port),
            log_level: env_or("PRAVO_LOG_LEVEL", defaults.log_level),
            database_url: env_or("DATABASE_URL", defaults.database_url),
            qdrant_url: env_or("QDRANT_URL", defaults.qdrant_url),
            collection: env_or("PRAVO_COLLECTION", defaults.collection),
            embedding_dimension: env_parsed("PRAVO_EMBEDDING_DIM", defaults.embedding_dimension),
            court_api_base: env_or("COURT_API_BASE", defaults.court_api_base),
            court_api_token: env_or("COURT_API_TOKEN", defaults.court_api_token),
            court_rate_limit_ms: env_parsed("COURT_RATE_LIMIT_MS", defaults.court_rate_limit_ms),
            legislation_base: env_or("LEGISLATION_BASE", defaults.legislation_base),
            llm_base_url: env_or("LLM_BASE_URL", defaults.llm_base_url),
            llm_api_key: env_or("LLM_API_KEY", defaults.llm_api_key),
            embedding_model: env_or("EMBEDDING_MODEL", defaults.embedding_model),
            ingest_concurrency: env_parsed("PRAVO_INGEST_CONCURRENCY", defaults.ingest_concurrency),
            cache_dir: env_or("PRAVO_CACHE_DIR", defaults.cache_dir),
            mcp_api_key: env::var("PRAVO_MCP_API_KEY").ok(),
            mcp_bearer_secret: env::var("PRAVO_MCP_BEARER_SECRET").ok(),
            tool_deadline_secs: env_parsed("PRAVO_TOOL_DEADLINE_SECS", defaults.tool_deadline_secs),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.embedding_dimension, 1536);
        assert_eq!(cfg.ingest_concurrency, 10);
        assert_eq!(cfg.court_rate_limit_ms, 200);
    }
}
