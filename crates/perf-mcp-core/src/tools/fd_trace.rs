//! `perf_fd_trace` — samples `/proc/<pid>/fd/` across a window, classifies
//! each descriptor, and flags a likely file-descriptor leak. No subprocess
//! is spawned; everything is a direct procfs read using std `read_dir`/
//! `read_link`, gated by an explicit pid check rather than the allow-list's
//! path regex table, since `fd/<n>` targets are not enumerable by a static
//! pattern.

use super::deps::ToolDeps;
use super::input::validate_pid;
use super::registry::{Tool, ToolResult};
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct FdTraceInput {
    pub pid: i64,
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default = "default_samples")]
    pub samples: u32,
}
fn default_duration() -> u32 {
    10
}
fn default_samples() -> u32 {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FdKind {
    File,
    Socket,
    Pipe,
    Eventfd,
    Timerfd,
    Signalfd,
    Epoll,
    AnonInode,
    Device,
    Unknown,
}

fn classify(target: &str) -> FdKind {
    if target.starts_with("socket:") {
        FdKind::Socket
    } else if target.starts_with("pipe:") {
        FdKind::Pipe
    } else if target.contains("anon_inode:[eventfd]") {
        FdKind::Eventfd
    } else if target.contains("anon_inode:[timerfd]") {
        FdKind::Timerfd
    } else if target.contains("anon_inode:[signalfd]") {
        FdKind::Signalfd
    } else if target.contains("anon_inode:[eventpoll]") {
        FdKind::Epoll
    } else if target.starts_with("anon_inode:") {
        FdKind::AnonInode
    } else if target.starts_with("/dev/") {
        FdKind::Device
    } else if target.starts_with('/') {
        FdKind::File
    } else {
        FdKind::Unknown
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FdSample {
    pub total: usize,
    pub by_kind: HashMap<String, usize>,
}

async fn sample_fds(pid: u32) -> Result<FdSample, ToolError> {
    let dir = format!("/proc/{pid}/fd");
    let mut rd = tokio::fs::read_dir(&dir)
        .await
        .map_err(|_| ToolError::new(ErrorCode::PidNotFound, format!("no such process or fd table unreadable: {pid}")))?;

    let mut sample = FdSample::default();
    while let Ok(Some(entry)) = rd.next_entry().await {
        let path = entry.path();
        let target = tokio::fs::read_link(&path).await.ok();
        let kind = match target {
            Some(t) => classify(&t.to_string_lossy()),
            None => FdKind::Unknown,
        };
        sample.total += 1;
        *sample.by_kind.entry(format!("{kind:?}").to_lowercase()).or_insert(0) += 1;
    }
    Ok(sample)
}

#[derive(Debug, Clone, Serialize)]
pub struct LeakDetection {
    pub is_likely_leak: bool,
    pub fd_growth_rate: f64,
    pub net_change: i64,
    pub interpretation: String,
}

pub struct FdTraceTool;

#[async_trait]
impl Tool for FdTraceTool {
    fn name(&self) -> &'static str {
        "perf_fd_trace"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: FdTraceInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let pid = match validate_pid(input.pid) {
            Ok(p) => p,
            Err(e) => return ctx.err(e),
        };
        let samples_n = input.samples.clamp(2, 20);
        let interval = (input.duration_seconds.max(1) as f64 / samples_n as f64).max(0.1);

        let mut samples = Vec::with_capacity(samples_n as usize);
        for i in 0..samples_n {
            match sample_fds(pid).await {
                Ok(s) => samples.push(s),
                Err(e) => return ctx.err(e),
            }
            if i + 1 < samples_n {
                tokio::time::sleep(std::time::Duration::from_secs_f64(interval)).await;
            }
        }

        let first = samples.first().map(|s| s.total).unwrap_or(0) as i64;
        let last = samples.last().map(|s| s.total).unwrap_or(0) as i64;
        let net_change = last - first;
        let elapsed_secs = (interval * (samples_n.saturating_sub(1)) as f64).max(0.001);
        let fd_growth_rate = net_change as f64 / elapsed_secs;

        let is_likely_leak = fd_growth_rate > 10.0 || net_change > 50;
        let interpretation = if is_likely_leak {
            format!("fd count grew from {first} to {last} ({fd_growth_rate:.1} fd/s) — looks like a file descriptor leak")
        } else {
            format!("fd count moved from {first} to {last} ({fd_growth_rate:.1} fd/s), within normal bounds")
        };

        let mut findings = Vec::new();
        if is_likely_leak {
            findings.push(make_finding(
                "fd_leak_suspected",
                Severity::Warning,
                "possible file descriptor leak",
                interpretation.clone(),
                Category::Process,
                FindingOpts { confidence: Some(70), ..Default::default() },
            ));
        }

        let data = serde_json::json!({
            "pid": pid,
            "samples": samples,
            "leak_detection": LeakDetection { is_likely_leak, fd_growth_rate, net_change, interpretation },
            "findings": findings,
        });
        ctx.ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_targets() {
        assert_eq!(classify("socket:[12345]"), FdKind::Socket);
        assert_eq!(classify("pipe:[6789]"), FdKind::Pipe);
        assert_eq!(classify("/var/log/app.log"), FdKind::File);
        assert_eq!(classify("anon_inode:[eventfd]"), FdKind::Eventfd);
    }

    /// S5 — fd leak detection scenario.
    #[test]
    fn s5_growth_triggers_leak_detection() {
        let first = 100i64;
        let last = 600i64;
        let elapsed = 60.0;
        let rate = (last - first) as f64 / elapsed;
        assert!(rate > 8.0 && rate < 8.5);
        assert!(rate > 10.0 || (last - first) > 50);
    }
}
