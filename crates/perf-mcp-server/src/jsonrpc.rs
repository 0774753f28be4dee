//! Minimal JSON-RPC 2.0 / MCP framing: requests, responses, and the
//! `tools/call` content-block wrapping a handler's envelope needs before
//! it goes out over the wire. This is a thin adapter layer, not part of
//! the tool substrate; it exists only so the crate runs as a real MCP
//! server end to end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn is_tool_call(&self) -> bool {
        self.method == "tools/call"
    }

    pub fn tool_params(&self) -> Option<CallToolParams> {
        if !self.is_tool_call() {
            return None;
        }
        serde_json::from_value(self.params.clone()).ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub error: RpcErrorBody,
}

#[derive(Debug, Serialize)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
}

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl JsonRpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, payload: ResponsePayload::Result(result) }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self { jsonrpc: "2.0", id, payload: ResponsePayload::Error(RpcError { error: RpcErrorBody { code, message: message.into() } }) }
    }
}

/// Wraps a tool's JSON envelope into the MCP `tools/call` result shape:
/// a single text content block carrying the serialized envelope, plus
/// `structuredContent` for clients that parse it directly, and `isError`
/// mirroring the envelope's own `success` flag.
pub fn tool_call_result(envelope: Value) -> Value {
    let is_error = envelope.get("success").and_then(Value::as_bool).map(|s| !s).unwrap_or(false);
    let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
    serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
        "structuredContent": envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_request() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"perf_snapshot","arguments":{}}}"#;
        let req: JsonRpcRequest = serde_json::from_str(raw).unwrap();
        assert!(req.is_tool_call());
        let params = req.tool_params().unwrap();
        assert_eq!(params.name, "perf_snapshot");
    }

    #[test]
    fn non_tool_call_has_no_tool_params() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let req: JsonRpcRequest = serde_json::from_str(raw).unwrap();
        assert!(req.tool_params().is_none());
    }

    #[test]
    fn tool_call_result_marks_error_from_envelope_success() {
        let env = serde_json::json!({ "success": false, "tool": "perf_snapshot" });
        let result = tool_call_result(env);
        assert_eq!(result["isError"], Value::Bool(true));
    }
}
