//! `perf_cgroup_stat` — cgroup v2 CPU/memory/IO controller stats for the
//! cgroup a given PID belongs to, read directly with no subprocess.

use super::deps::ToolDeps;
use super::input::validate_pid;
use super::registry::{Tool, ToolResult};
use crate::parsers::cgroup::{parse_cpu_max, parse_cpu_stat, parse_io_stat, parse_memory_stat, parse_single_value};
use crate::parsers::procfs::parse_pid_cgroup;
use crate::reader::read_file;
use async_trait::async_trait;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CgroupStatInput {
    pub pid: i64,
}

pub struct CgroupStatTool;

#[async_trait]
impl Tool for CgroupStatTool {
    fn name(&self) -> &'static str {
        "perf_cgroup_stat"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: CgroupStatInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let pid = match validate_pid(input.pid) {
            Ok(p) => p,
            Err(e) => return ctx.err(e),
        };

        let cgroup_file = read_file(&format!("/proc/{pid}/cgroup")).await;
        if !cgroup_file.success {
            return ctx.err(cgroup_file.error.unwrap_or_else(|| ToolError::new(ErrorCode::PidNotFound, "no such process")));
        }
        let cgroup_path = match parse_pid_cgroup(&cgroup_file.content) {
            Ok(p) => p,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        };
        let base = format!("/sys/fs/cgroup{cgroup_path}");

        let cpu_stat = read_file(&format!("{base}/cpu.stat")).await;
        let cpu_max = read_file(&format!("{base}/cpu.max")).await;
        let memory_current = read_file(&format!("{base}/memory.current")).await;
        let memory_max = read_file(&format!("{base}/memory.max")).await;
        let memory_stat = read_file(&format!("{base}/memory.stat")).await;
        let io_stat = read_file(&format!("{base}/io.stat")).await;

        let cpu = cpu_stat.success.then(|| parse_cpu_stat(&cpu_stat.content).ok()).flatten();
        let cpu_limits = cpu_max.success.then(|| parse_cpu_max(&cpu_max.content).ok()).flatten();
        let mem_current = memory_current.success.then(|| parse_single_value(&memory_current.content)).flatten();
        let mem_max = memory_max.success.then(|| parse_single_value(&memory_max.content)).flatten();
        let mem_stat_map = memory_stat.success.then(|| parse_memory_stat(&memory_stat.content).ok()).flatten();
        let io = io_stat.success.then(|| parse_io_stat(&io_stat.content).ok()).flatten();

        ctx.ok(serde_json::json!({
            "method": "cgroupfs",
            "cgroup_path": cgroup_path,
            "cpu_stat": cpu,
            "cpu_limits": cpu_limits.map(|l| serde_json::json!({"quota_usec": l.quota_usec, "period_usec": l.period_usec})),
            "memory_current_bytes": mem_current,
            "memory_max_bytes": mem_max,
            "memory_stat": mem_stat_map,
            "io_stat": io.map(|lines| lines.into_iter().map(|l| serde_json::json!({
                "device": l.device, "rbytes": l.rbytes, "wbytes": l.wbytes, "rios": l.rios, "wios": l.wios,
            })).collect::<Vec<_>>()),
        }))
    }
}
