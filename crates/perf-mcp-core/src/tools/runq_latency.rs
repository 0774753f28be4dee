//! `perf_runq_latency` — run-queue (scheduler) latency histogram. Prefers
//! BCC `runqlat` for a log2 histogram, falls back to an embedded
//! `bpftrace` template, and as a last resort to `perf sched latency`
//! per-task delay figures when neither eBPF path is available.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::bcc::templates::BpftraceParams;
use crate::bcc::templates::BpftraceTarget;
use crate::bcc::{run_with_fallback, Method};
use crate::executor::ExecRequest;
use crate::parsers::bcc::{parse_log2_histogram, render_bars, HistogramBucket};
use crate::parsers::perf::parse_sched_latency;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct RunqLatencyInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
}
fn default_duration() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedBucket {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u64,
    pub bar: String,
}

fn render_histogram(buckets: Vec<HistogramBucket>) -> Vec<RenderedBucket> {
    let bars = render_bars(&buckets);
    buckets
        .into_iter()
        .zip(bars)
        .map(|(b, bar)| RenderedBucket { range_start: b.range_start, range_end: b.range_end, count: b.count, bar })
        .collect()
}

pub struct RunqLatencyTool;

#[async_trait]
impl Tool for RunqLatencyTool {
    fn name(&self) -> &'static str {
        "perf_runq_latency"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: RunqLatencyInput = match serde_json::from_value(args) {
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

        let mut bcc_argv = vec!["-D".to_string(), duration.to_string()];
        if let Some(pid) = pid {
            bcc_argv.insert(0, pid.to_string());
            bcc_argv.insert(0, "-P".to_string());
        }
        let params = BpftraceParams { duration_seconds: duration, linear_bucket_ms: None, min_latency_ms: None, pid_filter: pid };
        let outcome = run_with_fallback(
            &deps.executor,
            &deps.bcc_cache,
            &deps.snapshot,
            "runqlat",
            bcc_argv,
            duration,
            Some(BpftraceTarget::RunqLatencyLog2),
            params,
        )
        .await;

        if let Some(err) = outcome.error {
            return self.perf_sched_fallback(deps, &ctx, duration, Some(err)).await;
        }
        match parse_log2_histogram(&outcome.stdout) {
            Ok(buckets) => {
                let method = match outcome.method {
                    Method::BccTool => "bcc_runqlat",
                    Method::BpftraceFallback => "bpftrace_fallback",
                };
                ctx.ok(serde_json::json!({ "method": method, "histogram": render_histogram(buckets) }))
            }
            Err(_) => self.perf_sched_fallback(deps, &ctx, duration, None).await,
        }
    }
}

impl RunqLatencyTool {
    async fn perf_sched_fallback(
        &self,
        deps: &ToolDeps,
        ctx: &perf_mcp_common::envelope::EnvelopeContext,
        duration: u32,
        prior_error: Option<ToolError>,
    ) -> ToolResult {
        if !deps.snapshot.has_tool(KnownTool::Perf) {
            return ctx.err(prior_error.unwrap_or_else(|| {
                ToolError::new(ErrorCode::CapabilityMissing, "no BCC/bpftrace/perf path available for run-queue latency")
            }));
        }
        let result = deps
            .executor
            .exec(ExecRequest {
                key: "perf".to_string(),
                argv: vec!["sched".to_string(), "latency".to_string()],
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 128 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "perf sched latency failed")));
        }
        match parse_sched_latency(&result.stdout) {
            Ok(entries) => ctx.ok(serde_json::json!({ "method": "perf_sched", "tasks": entries.iter().map(|e| serde_json::json!({
                "task": e.task, "pid": e.pid, "avg_delay_ms": e.avg_delay_ms, "max_delay_ms": e.max_delay_ms, "count": e.count,
            })).collect::<Vec<_>>() })),
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}
