//! `perf_disk_stat` — per-device disk utilization, queueing, and await
//! latency via `iostat -xz`, evaluated against the USE-method disk
//! thresholds.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::iostat::parse_iostat_xz;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::thresholds::{Status, DISK_AWAIT_MS, DISK_QUEUE_LENGTH, DISK_UTILIZATION_PCT};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DiskStatInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    2
}

fn status_to_severity(status: Status) -> Severity {
    match status {
        Status::Critical => Severity::Critical,
        Status::Warning => Severity::Warning,
        Status::Ok => Severity::Info,
    }
}

pub struct DiskStatTool;

#[async_trait]
impl Tool for DiskStatTool {
    fn name(&self) -> &'static str {
        "perf_disk_stat"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: DiskStatInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };
        if !deps.snapshot.has_tool(KnownTool::Iostat) {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "iostat is not available on this host"));
        }

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "iostat".to_string(),
                argv: vec!["-x".to_string(), "-z".to_string(), "1".to_string(), duration.max(2).to_string()],
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 128 * 1024,
                profiler_class: false,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "iostat failed")));
        }
        match parse_iostat_xz(&result.stdout) {
            Ok(devices) => {
                let mut findings = Vec::new();
                for d in &devices {
                    let util_status = DISK_UTILIZATION_PCT.evaluate(d.util_pct);
                    if util_status != Status::Ok {
                        findings.push(make_finding(
                            format!("disk_utilization_elevated_{}", d.device),
                            status_to_severity(util_status),
                            format!("{} is under heavy I/O load", d.device),
                            format!("{:.1}% utilization", d.util_pct),
                            Category::Io,
                            FindingOpts { confidence: Some(80), ..Default::default() },
                        ));
                    }
                    let queue_status = DISK_QUEUE_LENGTH.evaluate(d.avg_queue_size);
                    if queue_status != Status::Ok {
                        findings.push(make_finding(
                            format!("disk_queue_deep_{}", d.device),
                            status_to_severity(queue_status),
                            format!("{} has a deep I/O queue", d.device),
                            format!("average queue size {:.2}", d.avg_queue_size),
                            Category::Io,
                            FindingOpts { confidence: Some(75), ..Default::default() },
                        ));
                    }
                    let await_status = DISK_AWAIT_MS.evaluate(d.r_await_ms.max(d.w_await_ms));
                    if await_status != Status::Ok {
                        findings.push(make_finding(
                            format!("disk_await_elevated_{}", d.device),
                            status_to_severity(await_status),
                            format!("{} has elevated I/O latency", d.device),
                            format!("{:.1}ms read / {:.1}ms write await", d.r_await_ms, d.w_await_ms),
                            Category::Io,
                            FindingOpts { confidence: Some(80), ..Default::default() },
                        ));
                    }
                }
                ctx.ok(serde_json::json!({ "method": "iostat", "devices": devices, "findings": findings }))
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
        assert_eq!(default_duration(), 2);
    }
}
