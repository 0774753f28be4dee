//! `perf_syscall_count` — per-syscall counts over a window. Prefers BCC
//! `syscount` (optionally with per-syscall latency via `-L`), falls back to
//! the embedded `bpftrace` syscall-count template.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::bcc::templates::BpftraceParams;
use crate::bcc::templates::BpftraceTarget;
use crate::bcc::{run_with_fallback, Method};
use crate::parsers::bcc::{parse_syscount, SyscountEntry};
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SyscallCountInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub with_latency: bool,
}
fn default_duration() -> u32 {
    5
}

/// A single syscall count is "dominant" once it clears half the total.
const DOMINANT_SHARE: f64 = 0.5;
/// Aggregate syscall rate past which raw syscall overhead itself is worth
/// flagging, independent of which syscall dominates.
const HIGH_RATE_PER_SEC: f64 = 50_000.0;

pub struct SyscallCountTool;

#[async_trait]
impl Tool for SyscallCountTool {
    fn name(&self) -> &'static str {
        "perf_syscall_count"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: SyscallCountInput = match serde_json::from_value(args) {
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

        let mut bcc_argv = vec!["-d".to_string(), duration.to_string()];
        if input.with_latency {
            bcc_argv.push("-L".to_string());
        }
        if let Some(pid) = pid {
            bcc_argv.push("-p".to_string());
            bcc_argv.push(pid.to_string());
        }
        let params = BpftraceParams { duration_seconds: duration, linear_bucket_ms: None, min_latency_ms: None, pid_filter: pid };
        let outcome = run_with_fallback(
            &deps.executor,
            &deps.bcc_cache,
            &deps.snapshot,
            "syscount",
            bcc_argv,
            duration,
            Some(BpftraceTarget::SyscallCount),
            params,
        )
        .await;

        if let Some(err) = outcome.error {
            return ctx.err(err);
        }

        let entries = match outcome.method {
            Method::BccTool => parse_syscount(&outcome.stdout),
            Method::BpftraceFallback => parse_bpftrace_syscall_counts(&outcome.stdout),
        };
        match entries {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.count.cmp(&a.count));
                let total: u64 = entries.iter().map(|e| e.count).sum();
                let mut findings = Vec::new();
                if let Some(top) = entries.first() {
                    if total > 0 && (top.count as f64 / total as f64) >= DOMINANT_SHARE {
                        findings.push(make_finding(
                            "dominant_syscall",
                            Severity::Info,
                            format!("{} dominates syscall volume", top.name),
                            format!("{} accounts for {}/{} syscalls ({:.0}%)", top.name, top.count, total, (top.count as f64 / total as f64) * 100.0),
                            Category::Cpu,
                            FindingOpts { confidence: Some(85), ..Default::default() },
                        ));
                    }
                }
                let rate = total as f64 / duration.max(1) as f64;
                if rate >= HIGH_RATE_PER_SEC {
                    findings.push(make_finding(
                        "high_syscall_rate",
                        Severity::Warning,
                        "syscall rate is unusually high",
                        format!("{total} syscalls over {duration}s ({rate:.0}/s)"),
                        Category::Cpu,
                        FindingOpts { confidence: Some(70), ..Default::default() },
                    ));
                }
                let method = match outcome.method {
                    Method::BccTool => "bcc_syscount",
                    Method::BpftraceFallback => "bpftrace_fallback",
                };
                ctx.ok(serde_json::json!({ "method": method, "syscalls": entries, "total": total, "findings": findings }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

/// The bpftrace syscall-count template emits `@[probe]: count` pairs via its
/// default map-print-on-exit format, e.g. `@[tracepoint:syscalls:sys_enter_futex]: 9213`.
fn parse_bpftrace_syscall_counts(input: &str) -> Result<Vec<SyscountEntry>, crate::parsers::ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let Some((key, count_str)) = line.rsplit_once(':') else { continue };
        let Ok(count) = count_str.trim().parse::<u64>() else { continue };
        let name = key
            .trim_start_matches('@')
            .trim_start_matches('[')
            .trim_end_matches(']')
            .rsplit("sys_enter_")
            .next()
            .unwrap_or(key)
            .to_string();
        out.push(SyscountEntry { name, count, latency_ms: None });
    }
    if out.is_empty() {
        return Err(crate::parsers::ParseError::UnexpectedFormat("no bpftrace syscall counts parsed".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bpftrace_map_output() {
        let input = "@[tracepoint:syscalls:sys_enter_futex]: 9213\n@[tracepoint:syscalls:sys_enter_read]: 102\n";
        let rows = parse_bpftrace_syscall_counts(input).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.name == "futex" && r.count == 9213));
    }

    /// Mirrors the scenario where futex dominates syscall volume.
    #[test]
    fn dominant_share_detects_62_percent_futex() {
        let total = 14_890u64;
        let futex = 9_233u64;
        assert!((futex as f64 / total as f64) >= DOMINANT_SHARE);
    }
}
