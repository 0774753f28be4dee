//! `perf_snapshot` — a point-in-time or interval-sampled view of CPU, load,
//! and memory, read entirely from procfs.

use super::deps::ToolDeps;
use super::registry::{Tool, ToolResult};
use crate::reader::read_file;
use crate::parsers::procfs::{self, CpuUtilizationPct, LoadAvg};
use async_trait::async_trait;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SnapshotInput {
    #[serde(default)]
    pub interval_sec: Option<u32>,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleSample {
    pub cpu: CpuSample,
    pub load: LoadAvg,
    pub mem_available_pct: f64,
    pub swap_used_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSample {
    pub utilization: CpuUtilizationPct,
    pub run_queue: u32,
}

/// Tagged union, discriminated by `mode`: single-shot vs
/// interval.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode")]
pub enum SnapshotData {
    #[serde(rename = "single")]
    Single { sample: SingleSample },
    #[serde(rename = "interval")]
    Interval { samples: Vec<SingleSample>, summary: SingleSample },
}

async fn take_sample() -> Result<(procfs::CpuTimes, LoadAvg, std::collections::HashMap<String, u64>, u32), ToolError> {
    let stat = read_file("/proc/stat").await;
    let stat = procfs::parse_proc_stat(&stat.content).map_err(|e| ToolError::new(ErrorCode::ParseError, e.to_string()))?;
    let loadavg = read_file("/proc/loadavg").await;
    let loadavg = procfs::parse_loadavg(&loadavg.content).map_err(|e| ToolError::new(ErrorCode::ParseError, e.to_string()))?;
    let meminfo = read_file("/proc/meminfo").await;
    let meminfo = procfs::parse_meminfo(&meminfo.content).map_err(|e| ToolError::new(ErrorCode::ParseError, e.to_string()))?;
    Ok((stat.aggregate, loadavg, meminfo, stat.procs_running))
}

pub async fn single_shot(duration_seconds: u32) -> Result<SingleSample, ToolError> {
    let (before, _, _, _) = take_sample().await?;
    tokio::time::sleep(std::time::Duration::from_secs(duration_seconds.max(1) as u64)).await;
    let (after, load, meminfo, run_queue) = take_sample().await?;

    Ok(SingleSample {
        cpu: CpuSample { utilization: before.utilization_pct_since(&after), run_queue },
        load,
        mem_available_pct: procfs::mem_available_pct(&meminfo),
        swap_used_pct: procfs::swap_used_pct(&meminfo),
    })
}

pub struct SnapshotTool;

#[async_trait]
impl Tool for SnapshotTool {
    fn name(&self) -> &'static str {
        "perf_snapshot"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: SnapshotInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };

        match (input.interval_sec, input.count) {
            (Some(interval), Some(count)) if count > 0 => {
                if !(1..=60).contains(&interval) {
                    return ctx.err(ToolError::new(ErrorCode::InvalidDuration, "interval_sec must be between 1 and 60"));
                }
                let mut samples = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    match single_shot(interval).await {
                        Ok(sample) => samples.push(sample),
                        Err(e) => return ctx.err(e),
                    }
                }
                let summary = average_samples(&samples);
                ctx.ok(serde_json::to_value(SnapshotData::Interval { samples, summary }).unwrap())
            }
            _ => match single_shot(1).await {
                Ok(sample) => ctx.ok(serde_json::to_value(SnapshotData::Single { sample }).unwrap()),
                Err(e) => ctx.err(e),
            },
        }
    }
}

fn average_samples(samples: &[SingleSample]) -> SingleSample {
    let n = samples.len().max(1) as f64;
    let sum_user: f64 = samples.iter().map(|s| s.cpu.utilization.user).sum();
    let sum_system: f64 = samples.iter().map(|s| s.cpu.utilization.system).sum();
    let sum_iowait: f64 = samples.iter().map(|s| s.cpu.utilization.iowait).sum();
    let sum_idle: f64 = samples.iter().map(|s| s.cpu.utilization.idle).sum();
    let sum_mem: f64 = samples.iter().map(|s| s.mem_available_pct).sum();
    let sum_swap: f64 = samples.iter().map(|s| s.swap_used_pct).sum();
    let last = samples.last().cloned().unwrap_or(SingleSample {
        cpu: CpuSample { utilization: CpuUtilizationPct::default(), run_queue: 0 },
        load: LoadAvg::default(),
        mem_available_pct: 0.0,
        swap_used_pct: 0.0,
    });
    SingleSample {
        cpu: CpuSample {
            utilization: CpuUtilizationPct {
                user: sum_user / n,
                system: sum_system / n,
                iowait: sum_iowait / n,
                idle: sum_idle / n,
            },
            run_queue: last.cpu.run_queue,
        },
        load: last.load,
        mem_available_pct: sum_mem / n,
        swap_used_pct: sum_swap / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_summary_averages_utilization() {
        let samples = vec![
            SingleSample {
                cpu: CpuSample { utilization: CpuUtilizationPct { user: 10.0, system: 0.0, iowait: 0.0, idle: 90.0 }, run_queue: 0 },
                load: LoadAvg::default(),
                mem_available_pct: 80.0,
                swap_used_pct: 0.0,
            },
            SingleSample {
                cpu: CpuSample { utilization: CpuUtilizationPct { user: 20.0, system: 0.0, iowait: 0.0, idle: 80.0 }, run_queue: 1 },
                load: LoadAvg::default(),
                mem_available_pct: 70.0,
                swap_used_pct: 0.0,
            },
        ];
        let summary = average_samples(&samples);
        assert_eq!(summary.cpu.utilization.user, 15.0);
        assert_eq!(summary.mem_available_pct, 75.0);
        assert_eq!(summary.cpu.run_queue, 1);
    }
}
