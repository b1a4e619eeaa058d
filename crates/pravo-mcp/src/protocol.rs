//! JSON-RPC 2.0 wire types for the MCP surface.
//!
//! Requests are JSON-RPC objects; responses stream back as `data:` framed
//! SSE events, the last of which carries the result or error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-11-25", "2025-11-05", "2024-11-05"];

/// Method not found.
pub const CODE_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid JSON-RPC request shape.
pub const CODE_INVALID_REQUEST: i32 = -32600;
/// Non-retryable tool error.
pub const CODE_TOOL_ERROR: i32 = -32001;
/// Retryable tool error.
pub const CODE_TOOL_ERROR_RETRYABLE: i32 = -32002;

/// Request id: number or string per the JSON-RPC spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// An incoming JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `initialize` parameters we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
}

/// Server identity reported in `initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Picks the protocol version to answer with: the client's when we speak
/// it, otherwise our newest.
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .find(|supported| **supported == v)
        })
        .copied()
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_echoes_known_version() {
        assert_eq!(negotiate_protocol_version(Some("2024-11-05")), "2024-11-05");
        assert_eq!(negotiate_protocol_version(Some("2025-11-05")), "2025-11-05");
    }

    #[test]
    fn test_negotiation_falls_back_to_newest() {
        assert_eq!(negotiate_protocol_version(Some("1999-01-01")), "2025-11-25");
        assert_eq!(negotiate_protocol_version(None), "2025-11-25");
    }

    #[test]
    fn test_request_id_accepts_number_and_string() {
        let n: RequestId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(n, RequestId::Number(7));
        let s: RequestId = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(s, RequestId::String("abc".into()));
    }

    #[test]
    fn test_response_serialization_omits_empty_half() {
        let ok = JsonRpcResponse::success(Some(RequestId::Number(1)), serde_json::json!({}));
        let raw = serde_json::to_value(&ok).unwrap();
        assert!(raw.get("error").is_none());

        let err = JsonRpcResponse::error(None, CODE_METHOD_NOT_FOUND, "nope");
        let raw = serde_json::to_value(&err).unwrap();
        assert!(raw.get("result").is_none());
        assert_eq!(raw["error"]["code"], CODE_METHOD_NOT_FOUND);
    }
}
