//! `perf_offcpu_profile` — off-CPU (blocked/sleeping) time profile via BCC
//! `offcputime`. There is no `bpftrace` one-liner equivalent worth
//! maintaining for full kernel+user stack unwinding, so this tool has a
//! single method and reports `CAPABILITY_MISSING` when BCC is absent,
//! rather than silently degrading to a less meaningful substitute.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_offcputime_folded;
use async_trait::async_trait;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OffCpuProfileInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
}
fn default_duration() -> u32 {
    10
}

pub struct OffCpuProfileTool;

#[async_trait]
impl Tool for OffCpuProfileTool {
    fn name(&self) -> &'static str {
        "perf_offcpu_profile"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: OffCpuProfileInput = match serde_json::from_value(args) {
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

        if !deps.snapshot.has_bcc_tool("offcputime") {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "offcputime-bpfcc is not available on this host"));
        }

        let mut argv = vec!["-f".to_string()];
        if let Some(pid) = pid {
            argv.push("-p".to_string());
            argv.push(pid.to_string());
        }
        argv.push(duration.to_string());

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "offcputime".to_string(),
                argv,
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 512 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "offcputime failed")));
        }
        match parse_offcputime_folded(&result.stdout) {
            Ok(mut stacks) => {
                stacks.sort_by(|a, b| b.count.cmp(&a.count));
                stacks.truncate(20);
                ctx.ok(serde_json::json!({ "method": "bcc_offcputime", "stacks": stacks.iter().map(|s| serde_json::json!({
                    "frames": s.frames, "blocked_us": s.count,
                })).collect::<Vec<_>>() }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        assert_eq!(default_duration(), 10);
    }
}
