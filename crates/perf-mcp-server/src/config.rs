//! Server configuration, env-first with typed defaults. CLI flags, when
//! given, override whatever the environment already set.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl Transport {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Some(Transport::Stdio),
            "http" => Some(Transport::Http),
            _ => None,
        }
    }
}

/// Output-size caps: default 64 KiB, profile 256 KiB, absolute
/// max 1 MiB.
#[derive(Debug, Clone, Copy)]
pub struct OutputLimits {
    pub default: usize,
    pub profile: usize,
    pub max: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self { default: 64 * 1024, profile: 256 * 1024, max: 1024 * 1024 }
    }
}

/// Artifact TTL default: 1 hour.
pub const DEFAULT_ARTIFACT_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_ARTIFACT_MAX_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: Transport,
    pub http_bind: String,
    pub http_port: u16,
    pub bearer_token: Option<String>,
    pub artifact_dir: PathBuf,
    pub output_limits: OutputLimits,
    pub artifact_ttl_seconds: u64,
    pub tool_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            http_bind: "127.0.0.1".to_string(),
            http_port: 8787,
            bearer_token: None,
            artifact_dir: default_artifact_dir(),
            output_limits: OutputLimits::default(),
            artifact_ttl_seconds: DEFAULT_ARTIFACT_TTL_SECONDS,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn default_artifact_dir() -> PathBuf {
    env::temp_dir().join("perf-mcp").join("artifacts")
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = env::var("PERF_MCP_TRANSPORT") {
            if let Some(t) = Transport::from_str(&v) {
                cfg.transport = t;
            } else {
                eprintln!("WARN: unrecognized PERF_MCP_TRANSPORT='{v}', keeping stdio");
            }
        }
        if let Ok(v) = env::var("PERF_MCP_HTTP_BIND") {
            cfg.http_bind = v;
        }
        if let Ok(v) = env::var("PERF_MCP_HTTP_PORT") {
            if let Ok(p) = v.parse() {
                cfg.http_port = p;
            }
        }
        if let Ok(v) = env::var("PERF_MCP_TOKEN") {
            cfg.bearer_token = Some(v);
        }
        if let Ok(v) = env::var("PERF_MCP_ARTIFACT_DIR") {
            cfg.artifact_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("PERF_MCP_ARTIFACT_TTL_SECONDS") {
            if let Ok(ttl) = v.parse() {
                cfg.artifact_ttl_seconds = ttl;
            }
        }

        cfg
    }

    /// Applies CLI overrides on top of whatever `from_env` produced; CLI
    /// flags take precedence.
    pub fn apply_cli(mut self, cli: &crate::cli::Cli) -> Self {
        if let Some(t) = cli.transport.as_deref().and_then(Transport::from_str) {
            self.transport = t;
        }
        if let Some(port) = cli.http_port {
            self.http_port = port;
        }
        if let Some(bind) = &cli.http_bind {
            self.http_bind = bind.clone();
        }
        if let Some(dir) = &cli.artifact_dir {
            self.artifact_dir = dir.clone();
        }
        self
    }
}
