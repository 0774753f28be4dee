//! `perf_io_layers` — compares the block-device layer (`iostat`) against
//! the VFS layer (`vfsstat`) so a caller can tell whether I/O pressure is a
//! physical-device problem or an application/filesystem one.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_vfsstat;
use crate::parsers::iostat::parse_iostat_xz;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::thresholds::DISK_UTILIZATION_PCT;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IoLayersInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    3
}

pub struct IoLayersTool;

#[async_trait]
impl Tool for IoLayersTool {
    fn name(&self) -> &'static str {
        "perf_io_layers"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: IoLayersInput = match serde_json::from_value(args) {
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

        let device_result = deps
            .executor
            .exec(ExecRequest {
                key: "iostat".to_string(),
                argv: vec!["-x".to_string(), "-z".to_string(), "1".to_string(), "2".to_string()],
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 64 * 1024,
                profiler_class: false,
            })
            .await;
        if !device_result.success {
            return ctx.err(device_result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "iostat failed")));
        }
        let devices = match parse_iostat_xz(&device_result.stdout) {
            Ok(d) => d,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        };

        let vfs_layer = if deps.snapshot.has_bcc_tool("vfsstat") {
            let result = deps
                .executor
                .exec(ExecRequest {
                    key: "vfsstat".to_string(),
                    argv: vec![duration.to_string(), "1".to_string()],
                    timeout_ms: (duration as u64 + 10) * 1000,
                    max_output_bytes: 64 * 1024,
                    profiler_class: true,
                })
                .await;
            if result.success {
                parse_vfsstat(&result.stdout).ok().and_then(|mut s| s.pop())
            } else {
                None
            }
        } else {
            None
        };

        let mut findings = Vec::new();
        for device in &devices {
            let status = DISK_UTILIZATION_PCT.evaluate(device.util_pct);
            if status != perf_mcp_common::thresholds::Status::Ok {
                let severity = if status == perf_mcp_common::thresholds::Status::Critical { Severity::Critical } else { Severity::Warning };
                findings.push(make_finding(
                    format!("disk_utilization_elevated_{}", device.device),
                    severity,
                    format!("{} is saturated at the block layer", device.device),
                    format!("{:.1}% utilization, {:.1}ms/{:.1}ms r/w await", device.util_pct, device.r_await_ms, device.w_await_ms),
                    Category::Io,
                    FindingOpts { confidence: Some(80), ..Default::default() },
                ));
            }
        }
        if let (Some(vfs), true) = (vfs_layer.as_ref(), !devices.iter().any(|d| d.util_pct >= DISK_UTILIZATION_PCT.warn)) {
            if vfs.reads + vfs.writes > 10_000 {
                findings.push(make_finding(
                    "vfs_layer_active_without_device_pressure",
                    Severity::Info,
                    "high VFS activity with no block-device bottleneck",
                    format!("{} reads/s, {} writes/s at the VFS layer while no device exceeds the utilization threshold", vfs.reads, vfs.writes),
                    Category::Io,
                    FindingOpts { confidence: Some(60), ..Default::default() },
                ));
            }
        }

        ctx.ok(serde_json::json!({
            "method": "iostat+bcc_vfsstat",
            "device_layer": devices,
            "vfs_layer": vfs_layer,
            "findings": findings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_short() {
        assert_eq!(default_duration(), 3);
    }
}
