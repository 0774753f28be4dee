//! `perf_exec_trace` — new-process events via BCC `execsnoop`. No
//! `bpftrace` fallback: enumerating every `execve` with argv requires the
//! BCC tool's argument-array reassembly, which a single-probe bpftrace
//! script cannot approximate faithfully. Only runs when explicitly
//! requested.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_execsnoop;
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecTraceInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    5
}

/// A single command forking more than this many times in one window is
/// worth flagging as unusually "chatty" process churn.
const HIGH_FORK_RATE_COUNT: usize = 50;

pub struct ExecTraceTool;

#[async_trait]
impl Tool for ExecTraceTool {
    fn name(&self) -> &'static str {
        "perf_exec_trace"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: ExecTraceInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };
        if !deps.snapshot.has_bcc_tool("execsnoop") {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "execsnoop-bpfcc is not available on this host"));
        }

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "execsnoop".to_string(),
                argv: vec![],
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 256 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "execsnoop failed")));
        }
        match parse_execsnoop(&result.stdout) {
            Ok(events) => {
                let mut by_comm: HashMap<&str, usize> = HashMap::new();
                for e in &events {
                    *by_comm.entry(e.comm.as_str()).or_insert(0) += 1;
                }
                let mut findings = Vec::new();
                if let Some((comm, count)) = by_comm.iter().max_by_key(|(_, c)| **c) {
                    if *count >= HIGH_FORK_RATE_COUNT {
                        findings.push(make_finding(
                            "high_process_churn",
                            Severity::Warning,
                            "unusually high process fork/exec rate",
                            format!("{comm} was exec'd {count} times over {duration}s"),
                            Category::Process,
                            FindingOpts { confidence: Some(65), ..Default::default() },
                        ));
                    }
                }
                ctx.ok(serde_json::json!({ "method": "bcc_execsnoop", "events": events, "findings": findings }))
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
