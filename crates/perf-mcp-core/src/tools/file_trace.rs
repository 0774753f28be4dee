//! `perf_file_trace` — slow file operations via BCC `fileslower`. No
//! `bpftrace` fallback is defined: without BCC's VFS hooks there is no
//! single-probe equivalent worth approximating.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_simple_latency_rows;
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FileTraceInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default = "default_threshold_ms")]
    pub min_latency_ms: u32,
}
fn default_duration() -> u32 {
    5
}
fn default_threshold_ms() -> u32 {
    10
}

pub struct FileTraceTool;

#[async_trait]
impl Tool for FileTraceTool {
    fn name(&self) -> &'static str {
        "perf_file_trace"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: FileTraceInput = match serde_json::from_value(args) {
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
        if !deps.snapshot.has_bcc_tool("fileslower") {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "fileslower-bpfcc is not available on this host"));
        }

        let mut argv = Vec::new();
        if let Some(pid) = pid {
            argv.push("-p".to_string());
            argv.push(pid.to_string());
        }
        argv.push(input.min_latency_ms.to_string());

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "fileslower".to_string(),
                argv,
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 256 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "fileslower failed")));
        }
        match parse_simple_latency_rows(&result.stdout) {
            Ok(events) => {
                let mut findings = Vec::new();
                let slow_count = events.iter().filter(|e| e.ms >= 100.0).count();
                if slow_count > 0 {
                    findings.push(make_finding(
                        "slow_file_ops_detected",
                        Severity::Warning,
                        "file operations slower than 100ms observed",
                        format!("{slow_count} of {} traced operations exceeded 100ms", events.len()),
                        Category::Io,
                        FindingOpts { confidence: Some(70), ..Default::default() },
                    ));
                }
                ctx.ok(serde_json::json!({ "method": "bcc_fileslower", "events": events.iter().map(|e| serde_json::json!({
                    "pid": e.pid, "comm": e.comm, "detail": e.detail, "latency_ms": e.ms,
                })).collect::<Vec<_>>(), "findings": findings }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_10ms() {
        assert_eq!(default_threshold_ms(), 10);
    }
}
