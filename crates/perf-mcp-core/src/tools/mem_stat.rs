//! `perf_mem_stat` — system memory pressure: `/proc/meminfo`, swap usage,
//! and memory PSI, evaluated against the USE-method memory thresholds.

use super::deps::ToolDeps;
use super::registry::{Tool, ToolResult};
use crate::parsers::procfs::{mem_available_pct, parse_meminfo, parse_pressure, swap_used_pct};
use crate::reader::read_file;
use async_trait::async_trait;
use perf_mcp_common::findings::{make_finding, Category, FindingOpts, Severity};
use perf_mcp_common::thresholds::{Status, MEMORY_AVAILABLE_PCT, PSI_FULL_AVG10_PCT, PSI_SOME_AVG10_PCT, SWAP_USED_PCT};
use perf_mcp_common::{ErrorCode, ToolError};

pub struct MemStatTool;

fn status_to_severity(status: Status) -> Severity {
    match status {
        Status::Critical => Severity::Critical,
        Status::Warning => Severity::Warning,
        Status::Ok => Severity::Info,
    }
}

#[async_trait]
impl Tool for MemStatTool {
    fn name(&self) -> &'static str {
        "perf_mem_stat"
    }

    async fn run(&self, deps: &ToolDeps, _args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());

        let meminfo_file = read_file("/proc/meminfo").await;
        if !meminfo_file.success {
            return ctx.err(meminfo_file.error.unwrap_or_else(|| ToolError::new(ErrorCode::FileNotFound, "/proc/meminfo unavailable")));
        }
        let meminfo = match parse_meminfo(&meminfo_file.content) {
            Ok(m) => m,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        };
        let available_pct = mem_available_pct(&meminfo);
        let swap_pct = swap_used_pct(&meminfo);

        let psi_file = read_file("/proc/pressure/memory").await;
        let psi = psi_file.success.then(|| parse_pressure(&psi_file.content).ok()).flatten();

        let mut findings = Vec::new();
        let available_status = MEMORY_AVAILABLE_PCT.evaluate(available_pct);
        if available_status != Status::Ok {
            findings.push(make_finding(
                "memory_available_low",
                status_to_severity(available_status),
                "available memory is low",
                format!("{available_pct:.1}% of memory available"),
                Category::Memory,
                FindingOpts { confidence: Some(85), ..Default::default() },
            ));
        }
        let swap_status = SWAP_USED_PCT.evaluate(swap_pct);
        if swap_status != Status::Ok {
            findings.push(make_finding(
                "swap_usage_high",
                status_to_severity(swap_status),
                "swap usage is elevated",
                format!("{swap_pct:.1}% of swap in use"),
                Category::Memory,
                FindingOpts { confidence: Some(80), ..Default::default() },
            ));
        }
        if let Some(psi) = &psi {
            let some_status = PSI_SOME_AVG10_PCT.evaluate(psi.some.avg10);
            if some_status != Status::Ok {
                findings.push(make_finding(
                    "memory_psi_some_elevated",
                    status_to_severity(some_status),
                    "tasks are stalling on memory",
                    format!("some avg10={:.1}%", psi.some.avg10),
                    Category::Memory,
                    FindingOpts { confidence: Some(75), ..Default::default() },
                ));
            }
            if let Some(full) = psi.full {
                let full_status = PSI_FULL_AVG10_PCT.evaluate(full.avg10);
                if full_status != Status::Ok {
                    findings.push(make_finding(
                        "memory_psi_full_elevated",
                        status_to_severity(full_status),
                        "all tasks are stalling on memory simultaneously",
                        format!("full avg10={:.1}%", full.avg10),
                        Category::Memory,
                        FindingOpts { confidence: Some(85), ..Default::default() },
                    ));
                }
            }
        }

        ctx.ok(serde_json::json!({
            "method": "procfs",
            "mem_total_kb": meminfo.get("MemTotal"),
            "mem_available_pct": available_pct,
            "swap_used_pct": swap_pct,
            "psi": psi.map(|p| serde_json::json!({
                "some": {"avg10": p.some.avg10, "avg60": p.some.avg60, "avg300": p.some.avg300},
                "full": p.full.map(|f| serde_json::json!({"avg10": f.avg10, "avg60": f.avg60, "avg300": f.avg300})),
            })),
            "findings": findings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_severity() {
        assert_eq!(status_to_severity(Status::Critical), Severity::Critical);
        assert_eq!(status_to_severity(Status::Ok), Severity::Info);
    }
}
