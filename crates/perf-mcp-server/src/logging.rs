//! `tracing` + `tracing-subscriber` initialisation: an env-filter gated
//! JSON formatter writing to stderr. Every tool invocation emits a
//! structured span with `tool`, `duration_ms`, `success` at the dispatch
//! boundary (see [`crate::registry::dispatch`]).

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // JSON lines on stderr: stdout is reserved for the MCP JSON-RPC stream
    // when the stdio transport is selected, so logs must never land there.
    fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .with_current_span(true)
        .with_writer(std::io::stderr)
        .init();
}
