//! `perf_net_stat` — network throughput, drops, and retransmit rate via
//! paired `/proc/net/dev` + `/proc/net/snmp` reads, with an optional `ss -s`
//! socket summary layered on top.

use super::deps::ToolDeps;
use super::input::validate_duration;
use super::registry::{Tool, ToolResult};
use crate::executor::ExecRequest;
use crate::parsers::procfs::{parse_net_dev, parse_net_snmp};
use crate::parsers::ss::parse_ss_summary;
use crate::reader::read_file;
use async_trait::async_trait;
use perf_mcp_common::capability::KnownTool;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::thresholds::{Status, NET_DROPS_PER_SEC, NET_RETRANSMIT_PCT};
use perf_mcp_common::{ErrorCode, ToolError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NetStatInput {
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}
fn default_duration() -> u32 {
    2
}

pub struct NetStatTool;

#[async_trait]
impl Tool for NetStatTool {
    fn name(&self) -> &'static str {
        "perf_net_stat"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        let input: NetStatInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let duration = match validate_duration(input.duration_seconds) {
            Ok(d) => d,
            Err(e) => return ctx.err(e),
        };

        let dev_before = read_file("/proc/net/dev").await;
        let snmp_before = read_file("/proc/net/snmp").await;
        if !dev_before.success {
            return ctx.err(dev_before.error.unwrap_or_else(|| ToolError::new(ErrorCode::FileNotFound, "/proc/net/dev unavailable")));
        }
        tokio::time::sleep(std::time::Duration::from_secs(duration as u64)).await;
        let dev_after = read_file("/proc/net/dev").await;
        let snmp_after = read_file("/proc/net/snmp").await;
        if !dev_after.success {
            return ctx.err(dev_after.error.unwrap_or_else(|| ToolError::new(ErrorCode::FileNotFound, "/proc/net/dev unavailable")));
        }

        let before = match parse_net_dev(&dev_before.content) {
            Ok(m) => m,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        };
        let after = match parse_net_dev(&dev_after.content) {
            Ok(m) => m,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        };

        let mut interfaces = Vec::new();
        let mut findings = Vec::new();
        for (name, a) in &after {
            let Some(b) = before.get(name) else { continue };
            let rx_drops_per_sec = a.rx_drops.saturating_sub(b.rx_drops) as f64 / duration.max(1) as f64;
            let tx_drops_per_sec = a.tx_drops.saturating_sub(b.tx_drops) as f64 / duration.max(1) as f64;
            let drops_per_sec = rx_drops_per_sec + tx_drops_per_sec;
            let status = NET_DROPS_PER_SEC.evaluate(drops_per_sec);
            if status != Status::Ok {
                findings.push(make_finding(
                    format!("net_drops_elevated_{name}"),
                    if status == Status::Critical { Severity::Critical } else { Severity::Warning },
                    format!("{name} is dropping packets"),
                    format!("{drops_per_sec:.1} drops/s over {duration}s"),
                    Category::Network,
                    FindingOpts { confidence: Some(75), ..Default::default() },
                ));
            }
            interfaces.push(serde_json::json!({
                "interface": name,
                "rx_bytes_per_sec": a.rx_bytes.saturating_sub(b.rx_bytes) as f64 / duration.max(1) as f64,
                "tx_bytes_per_sec": a.tx_bytes.saturating_sub(b.tx_bytes) as f64 / duration.max(1) as f64,
                "rx_errors": a.rx_errors.saturating_sub(b.rx_errors),
                "tx_errors": a.tx_errors.saturating_sub(b.tx_errors),
                "drops_per_sec": drops_per_sec,
            }));
        }

        let mut retransmit_pct = None;
        if let (Ok(before_snmp), Ok(after_snmp)) = (parse_net_snmp(&snmp_before.content), parse_net_snmp(&snmp_after.content)) {
            if let (Some(b), Some(a)) = (before_snmp.get("Tcp"), after_snmp.get("Tcp")) {
                let out_segs_delta = a.get("OutSegs").copied().unwrap_or(0) - b.get("OutSegs").copied().unwrap_or(0);
                let retrans_delta = a.get("RetransSegs").copied().unwrap_or(0) - b.get("RetransSegs").copied().unwrap_or(0);
                if out_segs_delta > 0 {
                    let pct = (retrans_delta as f64 / out_segs_delta as f64) * 100.0;
                    let status = NET_RETRANSMIT_PCT.evaluate(pct);
                    if status != Status::Ok {
                        findings.push(make_finding(
                            "tcp_retransmit_rate_elevated",
                            if status == Status::Critical { Severity::Critical } else { Severity::Warning },
                            "elevated TCP retransmit rate",
                            format!("{pct:.2}% of outgoing segments retransmitted"),
                            Category::Network,
                            FindingOpts { confidence: Some(70), ..Default::default() },
                        ));
                    }
                    retransmit_pct = Some(pct);
                }
            }
        }

        let socket_summary = if deps.snapshot.has_tool(KnownTool::Ss) {
            let result = deps
                .executor
                .exec(ExecRequest {
                    key: "ss".to_string(),
                    argv: vec!["-s".to_string()],
                    timeout_ms: 5_000,
                    max_output_bytes: 16 * 1024,
                    profiler_class: false,
                })
                .await;
            if result.success {
                parse_ss_summary(&result.stdout).ok().map(|s| {
                    serde_json::json!({
                        "total": s.total, "tcp_estab": s.tcp_estab, "tcp_closed": s.tcp_closed,
                        "tcp_orphaned": s.tcp_orphaned, "tcp_timewait": s.tcp_timewait, "udp": s.udp,
                    })
                })
            } else {
                None
            }
        } else {
            None
        };

        ctx.ok(serde_json::json!({
            "method": "procfs",
            "interfaces": interfaces,
            "tcp_retransmit_pct": retransmit_pct,
            "socket_summary": socket_summary,
            "findings": findings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_short() {
        assert_eq!(default_duration(), 2);
    }
}
