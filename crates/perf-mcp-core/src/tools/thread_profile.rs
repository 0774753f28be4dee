//! `perf_thread_profile` — per-thread CPU share within a process over a
//! window. No subprocess: paired reads of `/proc/<pid>/task/<tid>/stat`
//! before and after `sleep(duration)`, the same before/after sampling
//! pattern `perf_snapshot` uses at the system level.

use super::deps::ToolDeps;
use super::input::{validate_duration, validate_pid};
use super::registry::{Tool, ToolResult};
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadProfileInput {
    pub pid: i64,
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    5
}

fn clock_ticks_per_sec() -> f64 {
    #[cfg(unix)]
    {
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            return hz as f64;
        }
    }
    100.0
}

/// `utime`/`stime` (fields 14, 15) from `/proc/<pid>/task/<tid>/stat`. The
/// `comm` field is parenthesized and may itself contain spaces, so the
/// split point is the *last* `)` on the line, not the second field.
fn parse_thread_stat(input: &str) -> Option<(String, u64, u64)> {
    let close = input.rfind(')')?;
    let open = input.find('(')?;
    let comm = input.get(open + 1..close)?.to_string();
    let rest: Vec<&str> = input[close + 1..].split_whitespace().collect();
    // rest[0] is field 3 (state); utime is field 14 => rest[11], stime field 15 => rest[12].
    let utime = rest.get(11)?.parse().ok()?;
    let stime = rest.get(12)?.parse().ok()?;
    Some((comm, utime, stime))
}

async fn read_tasks(pid: u32) -> Result<HashMap<u32, (String, u64, u64)>, ToolError> {
    let dir = format!("/proc/{pid}/task");
    let mut rd = tokio::fs::read_dir(&dir)
        .await
        .map_err(|_| ToolError::new(ErrorCode::PidNotFound, format!("no such process: {pid}")))?;

    let mut out = HashMap::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else { continue };
        let stat_path = format!("{dir}/{tid}/stat");
        if let Ok(content) = tokio::fs::read_to_string(&stat_path).await {
            if let Some(parsed) = parse_thread_stat(&content) {
                out.insert(tid, parsed);
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadCpuShare {
    pub tid: u32,
    pub comm: String,
    pub cpu_pct: f64,
}

pub struct ThreadProfileTool;

#[async_trait]
impl Tool for ThreadProfileTool {
    fn name(&self) -> &'static str {
        "perf_thread_profile"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let _ = &deps.snapshot;
        let input: ThreadProfileInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let pid = match validate_pid(input.pid) {
            Ok(p) => p,
            Err(e) => return ctx.err(e),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };

        let before = match read_tasks(pid).await {
            Ok(t) => t,
            Err(e) => return ctx.err(e),
        };
        tokio::time::sleep(std::time::Duration::from_secs(duration as u64)).await;
        let after = match read_tasks(pid).await {
            Ok(t) => t,
            Err(e) => return ctx.err(e),
        };

        let hz = clock_ticks_per_sec();
        let mut shares: Vec<ThreadCpuShare> = after
            .iter()
            .map(|(tid, (comm, u2, s2))| {
                let (u1, s1) = before.get(tid).map(|(_, u, s)| (*u, *s)).unwrap_or((0, 0));
                let ticks = (u2.saturating_sub(u1) + s2.saturating_sub(s1)) as f64;
                let cpu_pct = (ticks / hz) / duration.max(1) as f64 * 100.0;
                ThreadCpuShare { tid: *tid, comm: comm.clone(), cpu_pct }
            })
            .collect();
        shares.sort_by(|a, b| b.cpu_pct.partial_cmp(&a.cpu_pct).unwrap_or(std::cmp::Ordering::Equal));

        let mut findings = Vec::new();
        if let Some(top) = shares.first() {
            if top.cpu_pct >= 80.0 {
                findings.push(make_finding(
                    "thread_cpu_hotspot",
                    Severity::Info,
                    "one thread dominates CPU time",
                    format!("thread {} ({}) used {:.1}% of a CPU over {}s", top.tid, top.comm, top.cpu_pct, duration),
                    Category::Cpu,
                    FindingOpts { confidence: Some(75), ..Default::default() },
                ));
            }
        }

        ctx.ok(serde_json::json!({ "method": "procfs", "pid": pid, "threads": shares, "findings": findings }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_thread_stat_with_parenthesized_comm() {
        let line = "1234 (worker thread) S 1 1234 1234 0 -1 4194560 100 0 0 0 150 30 0 0 20 0 4 0 12345 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 2 0 0 0 0 0";
        let (comm, utime, stime) = parse_thread_stat(line).unwrap();
        assert_eq!(comm, "worker thread");
        assert_eq!(utime, 150);
        assert_eq!(stime, 30);
    }
}
