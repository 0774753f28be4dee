//! `perf_bio_latency` — block I/O latency histogram. Prefers BCC
//! `biolatency` for a log2 histogram, routes linear-bucket requests
//! straight to the `bpftrace` template (BCC's `biolatency` has no linear
//! mode), and falls back to an `iostat` snapshot when neither eBPF path is
//! available.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::bcc::templates::{argv_for, render, BpftraceParams, BpftraceTarget};
use crate::bcc::{run_with_fallback, Method};
use crate::executor::ExecRequest;
use crate::parsers::bcc::{parse_log2_histogram, render_bars, HistogramBucket};
use crate::parsers::bpftrace::parse_linear_histogram;
use crate::parsers::iostat::parse_iostat_xz;
use async_trait::async_trait;
use perf_mcp_common::envelope::EnvelopeContext;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, Finding, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramType {
    Log2,
    Linear,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BioLatencyInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub histogram_type: Option<HistogramType>,
    #[serde(default)]
    pub linear_bucket_ms: Option<u32>,
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

#[derive(Debug, Clone, Serialize)]
pub struct BioLatencyData {
    pub method: String,
    pub histogram: Vec<RenderedBucket>,
}

pub struct BioLatencyTool;

#[async_trait]
impl Tool for BioLatencyTool {
    fn name(&self) -> &'static str {
        "perf_bio_latency"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: BioLatencyInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };

        if input.histogram_type == Some(HistogramType::Linear) {
            return self.linear_via_bpftrace(&ctx, deps, duration, input.linear_bucket_ms.unwrap_or(10)).await;
        }
        self.log2_with_fallback(&ctx, deps, duration).await
    }
}

impl BioLatencyTool {
    async fn log2_with_fallback(&self, ctx: &EnvelopeContext, deps: &ToolDeps, duration: u32) -> ToolResult {
        let params = BpftraceParams { duration_seconds: duration, linear_bucket_ms: None, min_latency_ms: None, pid_filter: None };
        let outcome = run_with_fallback(
            &deps.executor,
            &deps.bcc_cache,
            &deps.snapshot,
            "biolatency",
            vec!["-D".to_string(), duration.to_string()],
            duration,
            Some(BpftraceTarget::BioLatencyLog2),
            params,
        )
        .await;

        if let Some(err) = outcome.error {
            return self.iostat_fallback(ctx, deps, duration, Some(err)).await;
        }
        match parse_log2_histogram(&outcome.stdout) {
            Ok(buckets) => {
                let method = match outcome.method {
                    Method::BccTool => "bcc_biolatency",
                    Method::BpftraceFallback => "bpftrace_fallback",
                };
                ctx.ok(serde_json::to_value(BioLatencyData { method: method.to_string(), histogram: render_histogram(buckets) }).unwrap())
            }
            Err(_) => self.iostat_fallback(ctx, deps, duration, None).await,
        }
    }

    async fn linear_via_bpftrace(&self, ctx: &EnvelopeContext, deps: &ToolDeps, duration: u32, bucket_ms: u32) -> ToolResult {
        if !deps.snapshot.has_tool(perf_mcp_common::capability::KnownTool::Bpftrace) {
            return self.iostat_fallback(ctx, deps, duration, None).await;
        }
        let params = BpftraceParams { duration_seconds: duration, linear_bucket_ms: Some(bucket_ms), min_latency_ms: None, pid_filter: None };
        let script = render(BpftraceTarget::BioLatencyLinear, &params);
        let result = deps
            .executor
            .exec(ExecRequest {
                key: "bpftrace".to_string(),
                argv: argv_for(script),
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 256 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return self.iostat_fallback(ctx, deps, duration, result.error).await;
        }
        match parse_linear_histogram(&result.stdout) {
            Ok(buckets) => ctx.ok(
                serde_json::to_value(BioLatencyData { method: "bpftrace_linear".to_string(), histogram: render_histogram(buckets) }).unwrap(),
            ),
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }

    async fn iostat_fallback(&self, ctx: &EnvelopeContext, deps: &ToolDeps, duration: u32, prior_error: Option<ToolError>) -> ToolResult {
        if !deps.snapshot.has_tool(perf_mcp_common::capability::KnownTool::Iostat) {
            return ctx.err(prior_error.unwrap_or_else(|| {
                ToolError::new(ErrorCode::CapabilityMissing, "no BCC/bpftrace/iostat path available for block I/O latency")
            }));
        }
        let result = deps
            .executor
            .exec(ExecRequest {
                key: "iostat".to_string(),
                argv: vec!["-x".to_string(), "-z".to_string(), "1".to_string(), "2".to_string()],
                timeout_ms: (duration as u64 + 5) * 1000,
                max_output_bytes: 64 * 1024,
                profiler_class: false,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "iostat failed")));
        }
        match parse_iostat_xz(&result.stdout) {
            Ok(devices) => {
                let findings: Vec<Finding> = devices
                    .iter()
                    .filter(|d| d.r_await_ms.max(d.w_await_ms) >= 20.0)
                    .map(|d| {
                        make_finding(
                            format!("disk_await_elevated_{}", d.device),
                            Severity::Warning,
                            format!("elevated disk latency on {}", d.device),
                            format!("await {}ms r / {}ms w", d.r_await_ms, d.w_await_ms),
                            Category::Io,
                            FindingOpts::default(),
                        )
                    })
                    .collect();
                let mut data = serde_json::json!({
                    "method": "iostat",
                    "devices": devices,
                });
                if !findings.is_empty() {
                    data["findings"] = serde_json::to_value(findings).unwrap();
                }
                ctx.ok(data)
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bars_proportional_to_count() {
        let buckets = vec![
            HistogramBucket { range_start: 0.0, range_end: 1.0, count: 2 },
            HistogramBucket { range_start: 1.0, range_end: 2.0, count: 40 },
        ];
        let rendered = render_histogram(buckets);
        assert_eq!(rendered[1].bar.len(), 40);
        assert!(rendered[0].bar.len() < rendered[1].bar.len());
    }
}
