//! HTTP transport: a single JSON-RPC POST endpoint gated by a bearer
//! token, for callers that can't spawn a subprocess and talk stdio.

use super::handle_request;
use crate::auth::check_bearer;
use crate::registry::ToolSpec;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use perf_mcp_core::tools::ToolDeps;
use std::sync::Arc;

struct AppState {
    specs: Vec<ToolSpec>,
    deps: ToolDeps,
    bearer_token: Option<String>,
}

pub async fn serve(specs: Vec<ToolSpec>, deps: ToolDeps, bind: &str, port: u16, bearer_token: Option<String>) -> anyhow::Result<()> {
    let state = Arc::new(AppState { specs, deps, bearer_token });
    let app = Router::new().route("/", post(handle_rpc)).with_state(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "perf-mcp-server listening over HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_rpc(State(state): State<Arc<AppState>>, headers: HeaderMap, body: axum::body::Bytes) -> impl IntoResponse {
    let auth_header = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if let Err(message) = check_bearer(&state.bearer_token, auth_header) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": message }))).into_response();
    }

    let req: crate::jsonrpc::JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": format!("invalid JSON-RPC request: {e}") }))).into_response();
        }
    };

    match handle_request(&state.specs, &state.deps, req).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_check_rejects_before_dispatch_when_configured() {
        assert!(check_bearer(&Some("tok".into()), Some("Bearer wrong")).is_err());
    }
}
