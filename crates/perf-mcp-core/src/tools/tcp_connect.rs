//! `perf_tcp_connect` — outbound TCP connection attempts via BCC
//! `tcpconnect`. No `bpftrace` fallback, for the same reason as
//! `perf_tcp_life`: reliably pairing the connect syscall with its
//! resolved remote address needs BCC's socket-struct walk.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::bcc::parse_tcpconnect;
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct TcpConnectInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[serde(default)]
    pub pid: Option<i64>,
}
fn default_duration() -> u32 {
    5
}

/// Distinct remote addresses contacted by one process past this count is
/// worth flagging as a fan-out pattern (connection storm, retry loop).
const HIGH_FANOUT_COUNT: usize = 20;

pub struct TcpConnectTool;

#[async_trait]
impl Tool for TcpConnectTool {
    fn name(&self) -> &'static str {
        "perf_tcp_connect"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: TcpConnectInput = match serde_json::from_value(args) {
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
        if !deps.snapshot.has_bcc_tool("tcpconnect") {
            return ctx.err(ToolError::new(ErrorCode::CapabilityMissing, "tcpconnect-bpfcc is not available on this host"));
        }

        let mut argv = Vec::new();
        if let Some(pid) = pid {
            argv.push("-p".to_string());
            argv.push(pid.to_string());
        }

        let result = deps
            .executor
            .exec(ExecRequest {
                key: "tcpconnect".to_string(),
                argv,
                timeout_ms: (duration as u64 + 10) * 1000,
                max_output_bytes: 256 * 1024,
                profiler_class: true,
            })
            .await;
        if !result.success {
            return ctx.err(result.error.unwrap_or_else(|| ToolError::new(ErrorCode::ExecutionFailed, "tcpconnect failed")));
        }
        match parse_tcpconnect(&result.stdout) {
            Ok(events) => {
                let mut by_pid: HashMap<u32, std::collections::HashSet<String>> = HashMap::new();
                for e in &events {
                    by_pid.entry(e.pid).or_default().insert(e.raddr.clone());
                }
                let mut findings = Vec::new();
                if let Some((pid, raddrs)) = by_pid.iter().max_by_key(|(_, addrs)| addrs.len()) {
                    if raddrs.len() >= HIGH_FANOUT_COUNT {
                        findings.push(make_finding(
                            "high_connection_fanout",
                            Severity::Info,
                            "process connecting to many distinct remotes",
                            format!("pid {pid} connected to {} distinct remote addresses over {duration}s", raddrs.len()),
                            Category::Network,
                            FindingOpts { confidence: Some(60), ..Default::default() },
                        ));
                    }
                }
                ctx.ok(serde_json::json!({ "method": "bcc_tcpconnect", "connections": events, "findings": findings }))
            }
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_short() {
        assert_eq!(default_duration(), 5);
    }
}
