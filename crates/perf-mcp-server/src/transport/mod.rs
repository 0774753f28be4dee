//! Transport adapters. Both transports funnel through [`handle_request`]
//! so the JSON-RPC method dispatch lives in exactly one place.

pub mod http;
pub mod stdio;

use crate::jsonrpc::{error_codes, tool_call_result, JsonRpcRequest, JsonRpcResponse};
use crate::registry::{self, ToolSpec};
use perf_mcp_core::tools::ToolDeps;
use serde_json::{json, Value};

const SERVER_NAME: &str = "perf-mcp-server";

/// Dispatches one JSON-RPC request to the appropriate handler. Returns
/// `None` for notifications (no `id`, e.g. `notifications/initialized`),
/// which per JSON-RPC must not receive a response.
pub async fn handle_request(specs: &[ToolSpec], deps: &ToolDeps, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let is_notification = req.id.is_null() && req.method.starts_with("notifications/");
    if is_notification {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            req.id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": { "name": SERVER_NAME, "version": deps.tool_version },
                "capabilities": { "tools": {} },
            }),
        ),
        "tools/list" => JsonRpcResponse::ok(
            req.id,
            json!({
                "tools": specs.iter().map(|s| json!({
                    "name": s.name,
                    "description": s.description,
                    "inputSchema": s.input_schema,
                })).collect::<Vec<_>>(),
            }),
        ),
        "tools/call" => match req.tool_params() {
            Some(params) => match registry::dispatch(specs, deps, &params.name, params.arguments).await {
                Ok(envelope) => JsonRpcResponse::ok(req.id, tool_call_result(envelope)),
                Err(message) => JsonRpcResponse::error(req.id, error_codes::INTERNAL_ERROR, message),
            },
            None => JsonRpcResponse::error(req.id, error_codes::INVALID_PARAMS, "tools/call requires {name, arguments}"),
        },
        "ping" => JsonRpcResponse::ok(req.id, json!({})),
        other => JsonRpcResponse::error(req.id, error_codes::METHOD_NOT_FOUND, format!("unknown method: {other}")),
    };
    Some(response)
}

pub fn parse_error_response(raw_id: Value) -> JsonRpcResponse {
    JsonRpcResponse::error(raw_id, error_codes::PARSE_ERROR, "request body was not valid JSON-RPC")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps_for_test() -> ToolDeps {
        ToolDeps::new(perf_mcp_common::CapabilitySnapshot::default(), std::env::temp_dir(), "0.0.0-test")
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let specs = registry::build();
        let deps = deps_for_test();
        let req: JsonRpcRequest = serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} })).unwrap();
        let resp = handle_request(&specs, &deps, req).await.unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn tools_list_includes_triage() {
        let specs = registry::build();
        let deps = deps_for_test();
        let req: JsonRpcRequest = serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" })).unwrap();
        let resp = handle_request(&specs, &deps, req).await.unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        let names: Vec<String> = value["result"]["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();
        assert!(names.contains(&"perf_triage".to_string()));
        assert!(names.contains(&"perf_capabilities".to_string()));
    }

    #[tokio::test]
    async fn notification_yields_no_response() {
        let specs = registry::build();
        let deps = deps_for_test();
        let req: JsonRpcRequest = serde_json::from_value(json!({ "jsonrpc": "2.0", "method": "notifications/initialized", "params": {} })).unwrap();
        assert!(handle_request(&specs, &deps, req).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let specs = registry::build();
        let deps = deps_for_test();
        let req: JsonRpcRequest = serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 3, "method": "bogus" })).unwrap();
        let resp = handle_request(&specs, &deps, req).await.unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["error"]["code"], error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_call_dispatches_to_capabilities() {
        let specs = registry::build();
        let deps = deps_for_test();
        let req: JsonRpcRequest =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": { "name": "perf_capabilities", "arguments": {} } })).unwrap();
        let resp = handle_request(&specs, &deps, req).await.unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["result"]["structuredContent"]["tool"], "perf_capabilities");
    }
}
