//! `perf_cpu_profile` — on-CPU sampling profile via `perf record` + `perf
//! report --stdio`. Profiler-class: the artifact lives under the artifact
//! store only for the duration of this call.

use super::artifact::{artifact_path, new_artifact_id};
use super::deps::ToolDeps;
use super::input::{validate_duration, validate_pid, validate_sample_rate};
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::perf::parse_report_stdio;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CpuProfileInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default = "default_hz")]
    pub sample_rate_hz: u32,
}
fn default_duration() -> u32 {
    10
}
fn default_hz() -> u32 {
    99
}

pub struct CpuProfileTool;

#[async_trait]
impl Tool for CpuProfileTool {
    fn name(&self) -> &'static str {
        "perf_cpu_profile"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: CpuProfileInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };
        let rate = match validate_sample_rate(input.sample_rate_hz) {
            Ok(r) => r,
            Err(e) => return ctx.err(e),
        };
        let pid = match input.pid {
            Some(p) => match validate_pid(p) {
                Ok(p) => Some(p),
                Err(e) => return ctx.err(e),
            },
            None => None,
        };
        if !deps.snapshot.has_tool(KnownTool::Perf) {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "perf is not available on this host"));
        }

        let id = new_artifact_id();
        let data_path = artifact_path(&deps.artifact_dir, &id, "data");
        let data_path_str = data_path.to_string_lossy().into_owned();

        let mut record_argv = vec!["record".to_string(), "-F".to_string(), rate.to_string(), "-g".to_string(), "-o".to_string(), data_path_str.clone()];
        match pid {
            Some(pid) => {
                record_argv.push("-p".to_string());
                record_argv.push(pid.to_string());
            }
            None => record_argv.push("-a".to_string()),
        }

        let record = deps
            .executor
            .exec(ExecRequest {
                key: "perf".to_string(),
                argv: record_argv,
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 16 * 1024,
                profiler_class: true,
            })
            .await;

        // `perf record` with no embedded duration runs until terminated; the
        // executor's timeout-driven SIGTERM is how we stop it after
        // `duration_seconds`, and `perf` flushes its data file cleanly on
        // SIGTERM, so a timeout here is the expected completion path, not a
        // failure, as long as the data file actually landed on disk.
        let completed_normally = record.success || record.error.as_ref().map(|e| e.code == ErrorCode::Timeout).unwrap_or(false);
        if !completed_normally {
            let _ = tokio::fs::remove_file(&data_path).await;
            return ctx.err(record.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "perf record failed")));
        }
        if tokio::fs::metadata(&data_path).await.is_err() {
            return ctx.err(ToolError::new(ErrorCode::ExecutionFailed, "perf record produced no data file"));
        }

        let report = deps
            .executor
            .exec(ExecRequest {
                key: "perf".to_string(),
                argv: vec!["report".to_string(), "--stdio".to_string(), "-i".to_string(), data_path_str, "--no-children".to_string()],
                timeout_ms: 15_000,
                max_output_bytes: 512 * 1024,
                profiler_class: false,
            })
            .await;
        let _ = tokio::fs::remove_file(&data_path).await;

        if !report.success {
            return ctx.err(report.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "perf report failed")));
        }
        match parse_report_stdio(&report.stdout) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.overhead_pct.partial_cmp(&a.overhead_pct).unwrap_or(std::cmp::Ordering::Equal));
                entries.truncate(20);
                let mut findings = Vec::new();
                if let Some(top) = entries.first() {
                    if top.overhead_pct >= 50.0 {
                        findings.push(make_finding(
                            "cpu_profile_hot_symbol",
                            Severity::Warning,
                            "a single symbol dominates CPU time",
                            format!("{} accounts for {:.1}% of sampled CPU time in {}", top.symbol, top.overhead_pct, top.command),
                            Category::Cpu,
                            FindingOpts { confidence: Some(75), ..Default::default() },
                        ));
                    }
                }
                ctx.ok(serde_json::json!({ "method": "perf_record", "top_symbols": entries, "findings": findings }))
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
        assert_eq!(default_hz(), 99);
    }
}
