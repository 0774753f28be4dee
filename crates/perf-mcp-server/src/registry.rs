//! Server-side tool registry: wraps `perf-mcp-core`'s flat tool registry
//! plus the triage orchestrator with the JSON-RPC metadata (name,
//! description, inputSchema) an MCP client needs for `tools/list`, and a
//! single `dispatch` entry point for `tools/call` that both transports
//! share. This is the only place the registry and the orchestrator are
//! combined — `perf-mcp-core` itself keeps them separate.

use perf_mcp_core::tools::ToolDeps;
use perf_mcp_core::{Tool, TriageTool};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    tool: Arc<dyn Tool>,
}

/// Common schema fragments so each tool's shape stays short and readable.
fn duration_prop() -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": 60, "description": "sampling duration in seconds (1-60)" })
}
fn pid_prop() -> Value {
    json!({ "type": "integer", "minimum": 1, "description": "target process id" })
}
fn optional_pid_prop() -> Value {
    json!({ "type": "integer", "minimum": 1, "description": "optional target process id; omit for system-wide" })
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": properties, "required": required, "additionalProperties": false })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {}, "additionalProperties": false })
}

/// The closed tool surface advertised over MCP.
/// Ordering matches `perf-mcp-core::tools::registry()` plus `perf_triage`
/// appended last, since triage is the only tool that depends on the
/// registry rather than being part of it.
pub fn build() -> Vec<ToolSpec> {
    let core_tools = perf_mcp_core::tools::registry();
    let mut specs: Vec<ToolSpec> = core_tools
        .into_iter()
        .map(|tool: Box<dyn Tool>| {
            let tool: Arc<dyn Tool> = Arc::from(tool);
            spec_for(tool)
        })
        .collect();
    specs.push(spec_for(Arc::new(TriageTool) as Arc<dyn Tool>));
    specs
}

fn spec_for(tool: Arc<dyn Tool>) -> ToolSpec {
    let name = tool.name();
    let (description, input_schema) = metadata_for(name);
    ToolSpec { name, description, input_schema, tool }
}

fn metadata_for(name: &str) -> (&'static str, Value) {
    match name {
        "perf_snapshot" => (
            "Single-shot or interval-mode system resource snapshot (CPU, memory, disk, network).",
            schema(json!({ "interval_sec": { "type": "integer", "minimum": 1, "maximum": 60 }, "count": { "type": "integer", "minimum": 1, "maximum": 60 } }), &[]),
        ),
        "perf_use_check" => (
            "USE-method (Utilization/Saturation/Errors) evaluation of the host's resources against fixed thresholds.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_bio_latency" => (
            "Block I/O latency histogram via BCC biolatency, falling back to a bpftrace template.",
            schema(
                json!({
                    "duration_seconds": duration_prop(),
                    "histogram_type": { "type": "string", "enum": ["log2", "linear"] },
                    "linear_bucket_ms": { "type": "integer", "minimum": 1 },
                }),
                &[],
            ),
        ),
        "perf_runq_latency" => (
            "Run-queue (scheduler) latency histogram via BCC runqlat, falling back to bpftrace.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop() }), &[]),
        ),
        "perf_fd_trace" => (
            "Samples a process's open file descriptors over time and detects leak-shaped growth.",
            schema(json!({ "pid": pid_prop(), "duration_seconds": duration_prop(), "samples": { "type": "integer", "minimum": 2, "maximum": 60 } }), &["pid"]),
        ),
        "perf_cpu_profile" => (
            "On-CPU sampling profile via perf record + perf report --stdio; profiler-class.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop(), "sample_rate_hz": { "type": "integer", "minimum": 1, "maximum": 999 } }), &[]),
        ),
        "perf_offcpu_profile" => (
            "Off-CPU time profile (blocked-time folded stacks) via BCC offcputime; profiler-class.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop() }), &[]),
        ),
        "perf_syscall_count" => (
            "Syscall frequency (and optionally latency) breakdown via BCC syscount, falling back to bpftrace.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop(), "with_latency": { "type": "boolean" } }), &[]),
        ),
        "perf_thread_profile" => (
            "Per-thread CPU/scheduling breakdown for a specific process via perf sched.",
            schema(json!({ "pid": pid_prop(), "duration_seconds": duration_prop() }), &["pid"]),
        ),
        "perf_io_layers" => (
            "Cross-layer I/O latency comparison (block device vs filesystem) via BCC tools.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_file_trace" => (
            "Slow file-operation trace via BCC fileslower, falling back to bpftrace.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop(), "min_latency_ms": { "type": "integer", "minimum": 1 } }), &[]),
        ),
        "perf_exec_trace" => (
            "Process-execution trace (new process launches) via BCC execsnoop.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_tcp_life" => (
            "TCP connection lifetime trace via BCC tcplife.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop() }), &[]),
        ),
        "perf_tcp_connect" => (
            "TCP connection attempt trace via BCC tcpconnect.",
            schema(json!({ "duration_seconds": duration_prop(), "pid": optional_pid_prop() }), &[]),
        ),
        "perf_net_stat" => (
            "Network interface and protocol-stack statistics from /proc/net, evaluated against USE thresholds.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_cgroup_stat" => (
            "Cgroup v2 controller statistics (cpu, memory, io, pids) for the cgroup owning a given PID.",
            schema(json!({ "pid": pid_prop() }), &["pid"]),
        ),
        "perf_mem_stat" => ("System memory pressure: /proc/meminfo, swap usage, memory PSI.", empty_schema()),
        "perf_disk_stat" => (
            "Per-device disk I/O statistics via iostat -xz, evaluated against USE thresholds.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_sched_latency" => (
            "Scheduler wakeup latency distribution via perf sched latency/timehist.",
            schema(json!({ "duration_seconds": duration_prop() }), &[]),
        ),
        "perf_capabilities" => ("Read-only dump of this host's detected capability snapshot.", empty_schema()),
        "perf_triage" => (
            "Root-cause triage: fans out to a mode-scoped subset of tools under a budget and ranks root-cause hypotheses.",
            schema(
                json!({
                    "pid": { "type": "integer", "minimum": 1 },
                    "process_name": { "type": "string" },
                    "mode": { "type": "string", "enum": ["quick", "standard", "deep"] },
                    "focus": { "type": "string", "enum": ["auto", "cpu", "memory", "io", "network"] },
                    "include_exec_trace": { "type": "boolean" },
                }),
                &[],
            ),
        ),
        other => panic!("no MCP metadata registered for tool {other}; add an entry to metadata_for"),
    }
}

/// Runs one tool by name, returning its envelope as JSON. Emits a
/// structured span (`tool`, `duration_ms`, `success`) around every
/// invocation.
pub async fn dispatch(specs: &[ToolSpec], deps: &ToolDeps, name: &str, args: Value) -> Result<Value, String> {
    let spec = specs.iter().find(|s| s.name == name).ok_or_else(|| format!("unknown tool: {name}"))?;
    let started = std::time::Instant::now();
    let envelope = spec.tool.run(deps, args).await;
    let envelope_json = serde_json::to_value(&envelope).map_err(|e| e.to_string())?;
    let success = envelope_json.get("success").and_then(Value::as_bool).unwrap_or(false);
    tracing::info!(tool = name, duration_ms = started.elapsed().as_millis() as u64, success, "tool invocation complete");
    Ok(envelope_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_tool_has_metadata() {
        let specs = build();
        assert!(!specs.is_empty());
        for spec in &specs {
            assert!(!spec.description.is_empty());
            assert!(spec.input_schema.is_object());
        }
    }

    #[test]
    fn triage_is_registered_once() {
        let specs = build();
        let triage_count = specs.iter().filter(|s| s.name == "perf_triage").count();
        assert_eq!(triage_count, 1);
    }

    #[test]
    fn names_are_unique() {
        let specs = build();
        let mut names: Vec<&str> = specs.iter().map(|s| s.name).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
