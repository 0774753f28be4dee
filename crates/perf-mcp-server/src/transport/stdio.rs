//! Stdio transport: newline-delimited JSON-RPC on stdin/stdout, the
//! default for an agent-launched subprocess. Each line is read, parsed,
//! dispatched, and answered before the next line is read.

use super::{handle_request, parse_error_response};
use crate::registry::ToolSpec;
use perf_mcp_core::tools::ToolDeps;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn serve(specs: Vec<ToolSpec>, deps: ToolDeps) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            tracing::info!("stdin closed, shutting down");
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str(trimmed) {
            Ok(req) => handle_request(&specs, &deps, req).await,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse JSON-RPC request");
                Some(parse_error_response(serde_json::Value::Null))
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
}
