//! BCC runtime.
//!
//! Encapsulates BCC's large first-run compile latency: preflight checks,
//! a compile-time estimate used to derive a dynamic timeout, execution,
//! and automatic fallback to an embedded `bpftrace` script on failure.

pub mod state;
pub mod templates;

use crate::executor::{ExecRequest, Executor};
use perf_mcp_common::capability::CapabilitySnapshot;
use perf_mcp_common::{ErrorCode, ToolError};
use state::{BccStateCache, BccToolHint};
use templates::{argv_for, render, BpftraceParams, BpftraceTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    BccTool,
    BpftraceFallback,
}

#[derive(Debug, Clone)]
pub struct BccOutcome {
    pub method: Method,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub error: Option<ToolError>,
}

const BASE_COMPILE_ESTIMATE_MS: u64 = 15_000;
const MAX_COMPILE_ESTIMATE_MS: u64 = 45_000;
const MIN_CPU_COUNT_FOR_FAST_COMPILE: usize = 4;

/// Dynamic timeout = `user_duration + compile_estimate + buffer`.
/// `compile_estimate` is the cached tool-specific value scaled by
/// 0.3 on a confirmed prior success, otherwise a base of 15s increased for
/// `!has_btf`, small CPU count, or container environment, capped at 45s.
pub fn compile_estimate_ms(snapshot: &CapabilitySnapshot, prior: Option<&BccToolHint>) -> u64 {
    if let Some(hint) = prior {
        if hint.compile_succeeded {
            return ((hint.compile_duration_ms as f64) * 0.3) as u64;
        }
    }
    let mut estimate = BASE_COMPILE_ESTIMATE_MS;
    if !snapshot.features.has_btf {
        estimate += 10_000;
    }
    if snapshot.environment.cpu_count < MIN_CPU_COUNT_FOR_FAST_COMPILE {
        estimate += 5_000;
    }
    if snapshot.environment.is_container {
        estimate += 5_000;
    }
    estimate.min(MAX_COMPILE_ESTIMATE_MS)
}

pub fn dynamic_timeout_ms(user_duration_seconds: u32, compile_estimate_ms: u64) -> u64 {
    const BUFFER_MS: u64 = 2_000;
    (user_duration_seconds as u64 * 1000) + compile_estimate_ms + BUFFER_MS
}

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("bcc tool {0} is not present on this host")]
    ToolMissing(String),
    #[error("insufficient privilege: need root or CAP_BPF+CAP_PERFMON")]
    InsufficientPrivilege,
    #[error("no kernel headers and no BTF available for CO-RE")]
    NoHeadersOrBtf,
}

fn preflight(snapshot: &CapabilitySnapshot, bcc_tool: &str) -> Result<(), PreflightError> {
    if !snapshot.has_bcc_tool(bcc_tool) {
        return Err(PreflightError::ToolMissing(bcc_tool.to_string()));
    }
    if !(snapshot.permissions.is_root || snapshot.permissions.can_run_bpf) {
        return Err(PreflightError::InsufficientPrivilege);
    }
    if !snapshot.features.has_btf {
        let headers = std::path::Path::new("/lib/modules")
            .join(&snapshot.kernel.version)
            .join("build")
            .exists();
        if !headers {
            return Err(PreflightError::NoHeadersOrBtf);
        }
    }
    Ok(())
}

/// Runs a BCC tool invocation with dynamic timeout, falling back to the
/// given bpftrace template on preflight failure, execution failure, or
/// timeout with empty stdout.
#[allow(clippy::too_many_arguments)]
pub async fn run_with_fallback(
    executor: &Executor,
    state_cache: &BccStateCache,
    snapshot: &CapabilitySnapshot,
    bcc_tool: &str,
    bcc_argv: Vec<String>,
    user_duration_seconds: u32,
    fallback: Option<BpftraceTarget>,
    fallback_params: BpftraceParams,
) -> BccOutcome {
    let prior = state_cache.get(bcc_tool).await;
    let estimate = compile_estimate_ms(snapshot, prior.as_ref());
    let timeout_ms = dynamic_timeout_ms(user_duration_seconds, estimate);

    if let Err(preflight_err) = preflight(snapshot, bcc_tool) {
        tracing::info!(tool = bcc_tool, error = %preflight_err, "bcc preflight failed");
        return fallback_or_error(executor, fallback, &fallback_params, timeout_ms, preflight_err.to_string()).await;
    }

    let compile_started = std::time::Instant::now();
    let result = executor
        .exec(ExecRequest {
            key: bcc_tool.to_string(),
            argv: bcc_argv,
            timeout_ms,
            max_output_bytes: 256 * 1024,
            profiler_class: true,
        })
        .await;
    let elapsed = compile_started.elapsed().as_millis() as u64;

    let timed_out = result.error.as_ref().map(|e| e.code == ErrorCode::Timeout).unwrap_or(false);
    let empty_success_output = result.success && result.stdout.trim().is_empty();

    state_cache
        .update(
            bcc_tool,
            BccToolHint {
                last_compile_time: chrono::Utc::now(),
                compile_succeeded: result.success && !timed_out,
                compile_duration_ms: elapsed,
                last_error: result.error.as_ref().map(|e| e.message.clone()),
            },
        )
        .await;

    if result.success && !empty_success_output {
        return BccOutcome {
            method: Method::BccTool,
            stdout: result.stdout,
            stderr: result.stderr,
            duration_ms: result.duration_ms,
            error: None,
        };
    }

    let reason = result
        .error
        .map(|e| e.message)
        .unwrap_or_else(|| "bcc tool produced no output".to_string());
    fallback_or_error(executor, fallback, &fallback_params, timeout_ms, reason).await
}

async fn fallback_or_error(
    executor: &Executor,
    fallback: Option<BpftraceTarget>,
    params: &BpftraceParams,
    timeout_ms: u64,
    reason: String,
) -> BccOutcome {
    let Some(target) = fallback else {
        return BccOutcome {
            method: Method::BccTool,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            error: Some(ToolError::new(ErrorCode::CapabilityMissing, reason)),
        };
    };

    let script = render(target, params);
    let result = executor
        .exec(ExecRequest {
            key: "bpftrace".to_string(),
            argv: argv_for(script),
            timeout_ms,
            max_output_bytes: 256 * 1024,
            profiler_class: true,
        })
        .await;

    BccOutcome {
        method: Method::BpftraceFallback,
        stdout: result.stdout,
        stderr: result.stderr,
        duration_ms: result.duration_ms,
        error: result.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_estimate_scales_down_on_prior_success() {
        let snapshot = CapabilitySnapshot::default();
        let hint = BccToolHint {
            last_compile_time: chrono::Utc::now(),
            compile_succeeded: true,
            compile_duration_ms: 20_000,
            last_error: None,
        };
        assert_eq!(compile_estimate_ms(&snapshot, Some(&hint)), 6_000);
    }

    #[test]
    fn compile_estimate_capped_at_max() {
        let mut snapshot = CapabilitySnapshot::default();
        snapshot.environment.cpu_count = 1;
        snapshot.environment.is_container = true;
        snapshot.features.has_btf = false;
        assert_eq!(compile_estimate_ms(&snapshot, None), MAX_COMPILE_ESTIMATE_MS);
    }

    #[test]
    fn dynamic_timeout_adds_buffer() {
        assert_eq!(dynamic_timeout_ms(5, 10_000), 17_000);
    }
}
