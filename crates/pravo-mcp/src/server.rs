//! The streamed endpoint: JSON-RPC in, SSE out.
//!
//! One POST route accepts a JSON-RPC request and answers with an event
//! stream. `tools/call` emits a progress notification before the result so
//! clients can render activity; every other method answers with a single
//! final event.

use crate::{
    authenticate, negotiate_protocol_version, AuthConfig, Caller, InitializeParams,
    JsonRpcRequest, JsonRpcResponse, RequestId, ServerInfo, CODE_INVALID_REQUEST,
    CODE_METHOD_NOT_FOUND, CODE_TOOL_ERROR,
};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::stream::{self, BoxStream, StreamExt};
use pravo_orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Server state shared by every request.
pub struct McpServer {
    pub orchestrator: Arc<Orchestrator>,
    pub auth: AuthConfig,
    pub server_name: String,
    pub server_version: String,
}

impl McpServer {
    pub fn new(orchestrator: Arc<Orchestrator>, auth: AuthConfig) -> Self {
        Self {
            orchestrator,
            auth,
            server_name: "pravo-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_endpoint))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

fn single(response: JsonRpcResponse) -> EventStream {
    stream::once(async move { Ok(frame(&response)) }).boxed()
}

fn frame<T: serde::Serialize>(value: &T) -> Event {
    let data = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Event::default().data(data)
}

fn sse_response(events: EventStream) -> Response {
    let sse = Sse::new(events).keep_alive(KeepAlive::default());
    let headers = [
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        (
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
    ];
    (headers, sse).into_response()
}

async fn mcp_endpoint(
    State(state): State<Arc<McpServer>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return sse_response(single(JsonRpcResponse::error(
                None,
                CODE_INVALID_REQUEST,
                format!("malformed JSON-RPC request: {e}"),
            )));
        }
    };
    let id = request.id.clone();

    let caller = authenticate(&headers, &state.auth);

    let open_method = matches!(request.method.as_str(), "initialize" | "ping");
    if !open_method && !state.auth.is_open() && caller == Caller::Anonymous {
        return sse_response(single(JsonRpcResponse::error(
            id,
            CODE_TOOL_ERROR,
            "unauthorized: provide a bearer token or X-Api-Key",
        )));
    }

    let events: EventStream = match request.method.as_str() {
        "initialize" => single(handle_initialize(&state, id, request.params)),
        "ping" => single(JsonRpcResponse::success(id, json!({}))),
        "prompts/list" => single(handle_prompts_list(id)),
        "resources/list" => single(JsonRpcResponse::success(id, json!({ "resources": [] }))),
        "tools/list" => {
            let tools = state.orchestrator.list_tools();
            single(JsonRpcResponse::success(id, json!({ "tools": tools })))
        }
        "tools/call" => handle_tools_call(state.clone(), caller, id, request.params).await,
        other => single(JsonRpcResponse::error(
            id,
            CODE_METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        )),
    };
    sse_response(events)
}

fn handle_initialize(
    state: &McpServer,
    id: Option<RequestId>,
    params: Option<Value>,
) -> JsonRpcResponse {
    let params: InitializeParams = params
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default();
    let negotiated = negotiate_protocol_version(params.protocol_version.as_deref());
    info!(protocol = negotiated, "client initialized");

    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": negotiated,
            "capabilities": {
                "tools": { "listChanged": false },
                "prompts": {},
                "resources": {},
            },
            "serverInfo": ServerInfo {
                name: state.server_name.clone(),
                version: state.server_version.clone(),
            },
        }),
    )
}

fn handle_prompts_list(id: Option<RequestId>) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "prompts": [
                {
                    "name": "legal_research",
                    "description": "Дослідити правове питання з посиланнями на практику та норми",
                    "arguments": [
                        {"name": "query", "description": "Правове питання", "required": true}
                    ]
                },
                {
                    "name": "document_review",
                    "description": "Проаналізувати завантажений договір: розділи, ризики, суми",
                    "arguments": [
                        {"name": "document_id", "description": "Ідентифікатор документа", "required": true}
                    ]
                }
            ]
        }),
    )
}

async fn handle_tools_call(
    state: Arc<McpServer>,
    caller: Caller,
    id: Option<RequestId>,
    params: Option<Value>,
) -> EventStream {
    let params = params.unwrap_or_else(|| json!({}));
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    // Unknown tool is a tool-level failure, not a protocol failure.
    if !state.orchestrator.has_tool(&name) {
        let result = json!({
            "content": [{ "type": "text", "text": format!("unknown tool: {name}") }],
            "isError": true,
        });
        return single(JsonRpcResponse::success(id, result));
    }

    let viewer: Option<Uuid> = match caller {
        Caller::User(user) => Some(user),
        Caller::Service | Caller::Anonymous => None,
    };

    let final_id = id.clone();
    let progress = json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {
            "progressToken": id,
            "progress": 0,
            "message": format!("running {name}"),
        }
    });
    let result_event = async move {
        let response = match state.orchestrator.call_as(viewer, &name, arguments).await {
            Ok(output) => {
                let text = serde_json::to_string(&output.payload).unwrap_or_default();
                let mut result = json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": output.payload,
                    "isError": false,
                });
                if !output.warnings.is_empty() {
                    result["warnings"] = json!(output.warnings);
                }
                JsonRpcResponse::success(final_id, result)
            }
            Err(e) => JsonRpcResponse::error(
                final_id,
                e.jsonrpc_code(),
                format!("{}: {e}", e.code()),
            ),
        };
        Ok(frame(&response))
    };

    stream::once(async move { Ok(frame(&progress)) })
        .chain(stream::once(result_event))
        .boxed()
}
