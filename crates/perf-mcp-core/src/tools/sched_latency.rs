//! `perf_sched_latency` — per-task scheduler wait/run time via `perf sched
//! record` + `perf sched timehist`, the non-eBPF companion to
//! `perf_runq_latency`'s histogram view.

use super::artifact::{artifact_path, new_artifact_id};
use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::perf::parse_timehist;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedLatencyInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    5
}

pub struct SchedLatencyTool;

#[async_trait]
impl Tool for SchedLatencyTool {
    fn name(&self) -> &'static str {
        "perf_sched_latency"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: SchedLatencyInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };
        if !deps.snapshot.has_tool(KnownTool::Perf) {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "perf is not available on this host"));
        }

        let id = new_artifact_id();
        let data_path = artifact_path(&deps.artifact_dir, &id, "data");
        let data_path_str = data_path.to_string_lossy().into_owned();

        let record = deps
            .executor
            .exec(ExecRequest {
                key: "perf".to_string(),
                argv: vec!["sched".to_string(), "record".to_string(), "-o".to_string(), data_path_str.clone()],
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 16 * 1024,
                profiler_class: true,
            })
            .await;
        // Same rationale as `perf_cpu_profile`: SIGTERM at the deadline is
        // how recording is stopped, and `perf` flushes on receipt of it.
        let completed_normally = record.success || record.error.as_ref().map(|e| e.code == ErrorCode::Timeout).unwrap_or(false);
        if !completed_normally || tokio::fs::metadata(&data_path).await.is_err() {
            let _ = tokio::fs::remove_file(&data_path).await;
            return ctx.err(record.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "perf sched record failed")));
        }

        let timehist = deps
            .executor
            .exec(ExecRequest {
                key: "perf".to_string(),
                argv: vec!["sched".to_string(), "timehist".to_string(), "-i".to_string(), data_path_str],
                timeout_ms: 15_000,
                max_output_bytes: 512 * 1024,
                profiler_class: false,
            })
            .await;
        let _ = tokio::fs::remove_file(&data_path).await;

        if !timehist.success {
            return ctx.err(timehist.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "perf sched timehist failed")));
        }
        match parse_timehist(&timehist.stdout) {
            Ok(rows) => {
                let mut by_task: HashMap<(u32, String), (f64, f64, u64)> = HashMap::new();
                for row in &rows {
                    let entry = by_task.entry((row.pid, row.comm.clone())).or_insert((0.0, 0.0, 0));
                    entry.0 += row.wait_time_ms;
                    entry.1 += row.sch_delay_ms;
                    entry.2 += 1;
                }
                let mut tasks: Vec<_> = by_task
                    .into_iter()
                    .map(|((pid, comm), (wait_total, delay_total, count))| {
                        serde_json::json!({
                            "pid": pid, "comm": comm, "events": count,
                            "avg_wait_ms": wait_total / count.max(1) as f64,
                            "avg_sch_delay_ms": delay_total / count.max(1) as f64,
                        })
                    })
                    .collect();
                tasks.sort_by(|a, b| {
                    b["avg_sch_delay_ms"].as_f64().unwrap_or(0.0).partial_cmp(&a["avg_sch_delay_ms"].as_f64().unwrap_or(0.0)).unwrap_or(std::cmp::Ordering::Equal)
                });
                let mut findings = Vec::new();
                if let Some(top) = tasks.first() {
                    if top["avg_sch_delay_ms"].as_f64().unwrap_or(0.0) >= 10.0 {
                        findings.push(make_finding(
                            "sched_delay_elevated",
                            Severity::Warning,
                            "a task is waiting unusually long to run",
                            format!("{} (pid {}) averages {:.1}ms scheduler delay", top["comm"], top["pid"], top["avg_sch_delay_ms"].as_f64().unwrap_or(0.0)),
                            Category::Cpu,
                            FindingOpts { confidence: Some(70), ..Default::default() },
                        ));
                    }
                }
                ctx.ok(serde_json::json!({ "method": "perf_sched", "tasks": tasks, "findings": findings }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_sane() {
        assert_eq!(default_duration(), 5);
    }
}
