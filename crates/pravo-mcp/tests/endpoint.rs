//! Endpoint tests: JSON-RPC over SSE against an in-memory stack.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pravo_core::Result;
use pravo_ingest::{
    DecisionFetcher, DecisionSearch, IngestWorker, ScrapeRequest, ScrapeWorker, Sectionizer,
};
use pravo_legislation::{ActSource, LegislationService};
use pravo_llm::testing::FakeProviderFactory;
use pravo_llm::{CostMeter, EmbeddingGateway};
use pravo_mcp::{router, AuthConfig, McpServer};
use pravo_orchestrator::{Orchestrator, ToolContext};
use pravo_patterns::PatternStore;
use pravo_sources::{DecisionText, FetchedAct, SearchPage, UploadParser};
use pravo_store::{MemoryMetaStore, MemoryVectorStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const DIM: usize = 8;

struct Nothing;

#[async_trait]
impl DecisionFetcher for Nothing {
    async fn fetch_decision(&self, doc_id: &str) -> Result<DecisionText> {
        Err(pravo_core::Error::not_found(format!("decision {doc_id}")))
    }
}

#[async_trait]
impl DecisionSearch for Nothing {
    async fn search_page(&self, _request: &ScrapeRequest, _page: usize) -> Result<SearchPage> {
        Ok(SearchPage {
            items: Vec::new(),
            total: Some(0),
            page: Some(1),
        })
    }
}

#[async_trait]
impl ActSource for Nothing {
    async fn fetch_act(&self, act_id: &str) -> Result<FetchedAct> {
        Err(pravo_core::Error::not_found(format!("act {act_id}")))
    }
}

fn server(auth: AuthConfig) -> axum::Router {
    let meta = Arc::new(MemoryMetaStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(DIM));
    let meter = Arc::new(CostMeter::new());
    let factory = Arc::new(FakeProviderFactory::new(DIM));
    let gateway = Arc::new(EmbeddingGateway::new(factory.embedder.clone(), meter.clone()));
    let legislation = Arc::new(LegislationService::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(Nothing),
    ));
    let patterns = Arc::new(PatternStore::new(meta.clone(), gateway.clone()));
    let ingest = Arc::new(IngestWorker::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(Nothing),
        Sectionizer::new(),
        2,
    ));
    let scraper = Arc::new(ScrapeWorker::new(Arc::new(Nothing), ingest.clone()));
    let ctx = ToolContext::new(
        meta,
        vectors,
        gateway,
        factory,
        legislation,
        patterns,
        ingest,
        scraper,
        Arc::new(UploadParser::new()),
        meter,
    );
    let orchestrator = Arc::new(Orchestrator::new(ctx));
    router(Arc::new(McpServer::new(orchestrator, auth)))
}

async fn rpc(app: &axum::Router, body: Value, headers: &[(&str, String)]) -> (StatusCode, Vec<Value>) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "text/event-stream");
    for (key, value) in headers {
        request = request.header(*key, value.as_str());
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default(),
        "text/event-stream"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    let events = raw
        .split("\n\n")
        .filter_map(|block| {
            let data: String = block
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect::<Vec<_>>()
                .join("\n");
            if data.is_empty() {
                None
            } else {
                serde_json::from_str(&data).ok()
            }
        })
        .collect();
    (status, events)
}

#[tokio::test]
async fn test_initialize_negotiates_protocol_version() {
    let app = server(AuthConfig::default());
    let (status, events) = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05"}
        }),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = &events.last().unwrap()["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "pravo-mcp");
}

#[tokio::test]
async fn test_initialize_unknown_version_falls_back() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "1990-01-01"}
        }),
        &[],
    )
    .await;
    assert_eq!(
        events.last().unwrap()["result"]["protocolVersion"],
        "2025-11-25"
    );
}

#[tokio::test]
async fn test_ping_is_open() {
    let app = server(AuthConfig {
        api_key: Some("sekret".into()),
        bearer_secret: None,
    });
    let (_, events) = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        &[],
    )
    .await;
    assert!(events.last().unwrap()["result"].is_object());
}

#[tokio::test]
async fn test_tools_list_requires_auth_when_configured() {
    let app = server(AuthConfig {
        api_key: Some("sekret".into()),
        bearer_secret: None,
    });

    let (_, events) = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}),
        &[],
    )
    .await;
    assert_eq!(events.last().unwrap()["error"]["code"], -32001);

    let (_, events) = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"}),
        &[("x-api-key", "sekret".to_string())],
    )
    .await;
    let tools = events.last().unwrap()["result"]["tools"].as_array().unwrap().clone();
    assert!(tools.len() >= 30);
    assert!(tools
        .iter()
        .any(|t| t["name"] == "get_legal_advice" && t["inputSchema"].is_object()));
}

#[tokio::test]
async fn test_unknown_method_is_32601() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(
        &app,
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/destroy"}),
        &[],
    )
    .await;
    assert_eq!(events.last().unwrap()["error"]["code"], -32601);
}

#[tokio::test]
async fn test_unknown_tool_is_error_result() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "no_such_tool", "arguments": {}}
        }),
        &[],
    )
    .await;
    let result = &events.last().unwrap()["result"];
    assert_eq!(result["isError"], true);
}

#[tokio::test]
async fn test_tool_call_streams_progress_then_result() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "calculate_procedural_deadlines",
                "arguments": {
                    "procedure_code": "cpc",
                    "appeal_type": "appeal",
                    "event_type": "decision",
                    "event_date": "2024-01-15"
                }
            }
        }),
        &[],
    )
    .await;

    assert!(events.len() >= 2, "expected progress + result, got {events:?}");
    assert_eq!(events[0]["method"], "notifications/progress");
    let result = &events.last().unwrap()["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["days"], 30);
    assert_eq!(
        result["structuredContent"]["variants"][0]["end_date"],
        "2024-02-14"
    );
}

#[tokio::test]
async fn test_malformed_arguments_surface_as_jsonrpc_error() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(
        &app,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {
                "name": "calculate_procedural_deadlines",
                "arguments": {"procedure_code": "cpc"}
            }
        }),
        &[],
    )
    .await;
    let error = &events.last().unwrap()["error"];
    assert_eq!(error["code"], -32001);
    assert!(error["message"].as_str().unwrap().contains("INVALID_ARGUMENT"));
}

#[tokio::test]
async fn test_malformed_request_body() {
    let app = server(AuthConfig::default());
    let (_, events) = rpc(&app, json!({"no": "rpc"}), &[]).await;
    assert_eq!(events.last().unwrap()["error"]["code"], -32600);
}
