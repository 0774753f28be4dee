//! `perf_use_check` — delegates to `perf_snapshot` then applies the pure
//! USE-method threshold evaluator.

use super::deps::ToolDeps;
use super::registry::{Tool, ToolResult};
use super::snapshot::single_shot;
use async_trait::async_trait;
use perf_mcp_common::thresholds::{self, Status};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UseCheckInput {
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceUse {
    pub utilization: f64,
    pub saturation: f64,
    pub errors: f64,
    pub status: Status,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseCheckData {
    pub cpu: ResourceUse,
    pub memory: ResourceUse,
    pub overall_status: Status,
    pub top_suspicions: Vec<String>,
}

/// Pure: given a fixed snapshot this always returns the same result.
pub fn evaluate(sample: &super::snapshot::SingleSample, cpu_count: usize) -> UseCheckData {
    let user_busy = sample.cpu.utilization.user + sample.cpu.utilization.system + sample.cpu.utilization.iowait;
    let cpu_util_status = thresholds::CPU_UTILIZATION_PCT.evaluate(user_busy);
    let saturation_ratio = sample.cpu.run_queue as f64 / cpu_count.max(1) as f64;
    let cpu_sat_status = thresholds::CPU_SATURATION_RATIO.evaluate(saturation_ratio);
    let cpu_status = cpu_util_status.max(cpu_sat_status);

    let cpu = ResourceUse {
        utilization: user_busy,
        saturation: saturation_ratio,
        errors: 0.0,
        status: cpu_status,
        detail: format!("{user_busy:.1}% busy, run queue {} on {} CPUs", sample.cpu.run_queue, cpu_count),
    };

    let mem_status = thresholds::MEMORY_AVAILABLE_PCT.evaluate(sample.mem_available_pct);
    let swap_status = thresholds::SWAP_USED_PCT.evaluate(sample.swap_used_pct);
    let memory = ResourceUse {
        utilization: 100.0 - sample.mem_available_pct,
        saturation: sample.swap_used_pct,
        errors: 0.0,
        status: mem_status.max(swap_status),
        detail: format!("{:.1}% available, {:.1}% swap used", sample.mem_available_pct, sample.swap_used_pct),
    };

    let overall_status = thresholds::overall_status([cpu.status, memory.status]);

    let mut suspicions = Vec::new();
    if cpu_util_status >= Status::Warning {
        suspicions.push(format!("CPU utilization elevated: {}", cpu.detail));
    }
    if cpu_sat_status >= Status::Warning {
        suspicions.push(format!("CPU saturation elevated: run queue {} on {} CPUs", sample.cpu.run_queue, cpu_count));
    }
    if mem_status >= Status::Warning {
        suspicions.push(format!("memory pressure: {}", memory.detail));
    }

    UseCheckData { cpu, memory, overall_status, top_suspicions: suspicions }
}

pub struct UseCheckTool;

#[async_trait]
impl Tool for UseCheckTool {
    fn name(&self) -> &'static str {
        "perf_use_check"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: UseCheckInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = input.duration_seconds.unwrap_or(1).clamp(1, 5);

        match single_shot(duration).await {
            Ok(sample) => {
                let data = evaluate(&sample, deps.snapshot.environment.cpu_count);
                ctx.ok(serde_json::to_value(data).unwrap())
            }
            Err(e) => ctx.err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::snapshot::{CpuSample, SingleSample};
    use crate::parsers::procfs::{CpuUtilizationPct, LoadAvg};

    fn idle_sample() -> SingleSample {
        SingleSample {
            cpu: CpuSample { utilization: CpuUtilizationPct { user: 2.0, system: 1.0, iowait: 0.0, idle: 97.0 }, run_queue: 0 },
            load: LoadAvg::default(),
            mem_available_pct: 60.0,
            swap_used_pct: 0.0,
        }
    }

    /// S1 — USE on idle system.
    #[test]
    fn s1_idle_system_is_healthy() {
        let data = evaluate(&idle_sample(), 16);
        assert_eq!(data.overall_status, Status::Ok);
        assert!(data.top_suspicions.is_empty());
    }

    /// CPU saturation scenario: high run-queue depth should flag CPU as the
    /// top suspect.
    #[test]
    fn s2_cpu_saturation_scenario() {
        let sample = SingleSample {
            cpu: CpuSample { utilization: CpuUtilizationPct { user: 78.5, system: 13.3, iowait: 0.0, idle: 8.2 }, run_queue: 18 },
            load: LoadAvg::default(),
            mem_available_pct: 60.0,
            swap_used_pct: 0.0,
        };
        let data = evaluate(&sample, 16);
        assert_eq!(data.cpu.status, Status::Warning);
        assert!(data.cpu.detail.contains("78.5% busy"));
        assert!(data.top_suspicions.iter().any(|s| s.starts_with("CPU utilization elevated")));
    }
}
