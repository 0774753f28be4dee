//! `perf-mcp-server` — MCP server binary exposing perf-mcp's ~20 tool
//! handlers plus `perf_triage` over stdio or HTTP.
//!
//! This binary is the thin adapter layer: protocol framing, CLI, config,
//! and transport selection. The actual substrate (allow-list, executor,
//! capability detection, BCC runtime, parsers, tool handlers, triage)
//! lives in `perf-mcp-core`.

mod artifact_sweep;
mod auth;
mod cli;
mod config;
mod jsonrpc;
mod logging;
mod registry;
mod transport;

use clap::Parser;
use config::{ServerConfig, Transport};
use perf_mcp_core::tools::ToolDeps;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_level);

    let config = ServerConfig::from_env().apply_cli(&cli);
    tracing::info!(transport = ?config.transport, artifact_dir = %config.artifact_dir.display(), "starting perf-mcp-server");

    tokio::fs::create_dir_all(&config.artifact_dir).await.ok();
    artifact_sweep::spawn(config.artifact_dir.clone(), std::time::Duration::from_secs(config.artifact_ttl_seconds));

    let snapshot = perf_mcp_core::capability::snapshot().await.clone();
    tracing::info!(
        kernel = %snapshot.kernel.version,
        is_container = snapshot.environment.is_container,
        can_run_perf = snapshot.permissions.can_run_perf,
        can_run_bpf = snapshot.permissions.can_run_bpf,
        "capability snapshot detected"
    );

    let deps = ToolDeps::new(snapshot, config.artifact_dir.clone(), config.tool_version.clone());
    let specs = registry::build();

    match config.transport {
        Transport::Stdio => transport::stdio::serve(specs, deps).await,
        Transport::Http => transport::http::serve(specs, deps, &config.http_bind, config.http_port, config.bearer_token.clone()).await,
    }
}
