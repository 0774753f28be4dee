use clap::Parser;
use std::path::PathBuf;

/// Exposes the perf-mcp tool registry as an MCP server over stdio or HTTP.
#[derive(Parser, Debug)]
#[command(name = "perf-mcp-server", version, about = "Linux performance-diagnosis MCP server")]
pub struct Cli {
    /// Transport to serve on: "stdio" (default) or "http".
    #[arg(long, env = "PERF_MCP_TRANSPORT")]
    pub transport: Option<String>,

    /// Bind address for the HTTP transport.
    #[arg(long, env = "PERF_MCP_HTTP_BIND")]
    pub http_bind: Option<String>,

    /// Bind port for the HTTP transport.
    #[arg(long, env = "PERF_MCP_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Base directory for artifact files and BCC compile-state hints.
    #[arg(long, env = "PERF_MCP_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Log verbosity passed through to `tracing`'s `EnvFilter` when
    /// `RUST_LOG` is not already set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
