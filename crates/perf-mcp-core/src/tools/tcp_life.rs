//! `perf_tcp_life` — TCP session lifetimes and byte counts via BCC
//! `tcplife`. No `bpftrace` fallback: reconstructing full session lifetime
//! (connect through close with byte totals) needs BCC's socket-state
//! tracking, not a single kprobe.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_tcplife;
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TcpLifeInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
}
fn default_duration() -> u32 {
    5
}

/// A connection living less than this many milliseconds is short-lived
/// enough to suggest connection churn rather than sustained traffic.
const SHORT_LIVED_MS: f64 = 100.0;

pub struct TcpLifeTool;

#[async_trait]
impl Tool for TcpLifeTool {
    fn name(&self) -> &'static str {
        "perf_tcp_life"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: TcpLifeInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };
        let pid = match input.pid {
            Some(p) if p <= 0 => return ctx.err(ToolError::new(ErrorCode::InvalidPid, "pid must be positive")),
            Some(p) => Some(p as u32),
            None => None,
        };
        if !deps.snapshot.has_bcc_tool("tcplife") {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "tcplife-bpfcc is not available on this host"));
        }

        let mut argv = Vec::new();
        if let Some(pid) = pid {
            argv.push("-p".to_string());
            argv.push(pid.to_string());
        }

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "tcplife".to_string(),
                argv,
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 256 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "tcplife failed")));
        }
        match parse_tcplife(&result.stdout) {
            Ok(events) => {
                let short_lived = events.iter().filter(|e| e.ms < SHORT_LIVED_MS).count();
                let mut findings = Vec::new();
                if events.len() >= 10 && short_lived as f64 / events.len() as f64 >= 0.5 {
                    findings.push(make_finding(
                        "short_lived_tcp_connections",
                        Severity::Info,
                        "many short-lived TCP connections",
                        format!("{short_lived} of {} observed connections lasted under {SHORT_LIVED_MS}ms", events.len()),
                        Category::Network,
                        FindingOpts { confidence: Some(60), ..Default::default() },
                    ));
                }
                ctx.ok(serde_json::json!({ "method": "bcc_tcplife", "connections": events, "findings": findings }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_short() {
        assert_eq!(default_duration(), 5);
    }
}
