//! `perf_triage`, the root-cause orchestrator.
//!
//! Triage fans out to a fixed subset of the subordinate tools under a
//! mode-based time budget, isolates their failures rather than aborting, and
//! applies a small data-driven rule table over the merged findings to rank
//! root-cause hypotheses. It is the only component that depends on the flat
//! tool registry; the registry never depends back on this.

use crate::tools::{find, registry, Tool, ToolDeps};
use async_trait::async_trait;
use perf_mcp_common::envelope::Envelope;
use perf_mcp_common::findings::{dedup_keep_highest_severity, make_finding, Category, Finding, FindingOpts, Severity};
use perf_mcp_common::thresholds::Status;
use perf_mcp_common::{ErrorCode, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageMode {
    Quick,
    Standard,
    Deep,
}

impl TriageMode {
    fn duration_seconds(self) -> u32 {
        match self {
            TriageMode::Quick => 5,
            TriageMode::Standard => 10,
            TriageMode::Deep => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriageFocus {
    #[default]
    Auto,
    Cpu,
    Memory,
    Io,
    Network,
}

impl TriageFocus {
    /// `None` means "focus does not gate this tool" (run it regardless).
    fn gates(self, category: Category) -> bool {
        match self {
            TriageFocus::Auto => true,
            TriageFocus::Cpu => category == Category::Cpu || category == Category::Process,
            TriageFocus::Memory => category == Category::Memory,
            TriageFocus::Io => category == Category::Io,
            TriageFocus::Network => category == Category::Network,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TriageInput {
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub mode: Option<TriageMode>,
    #[serde(default)]
    pub focus: TriageFocus,
    #[serde(default)]
    pub include_exec_trace: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hypothesis {
    pub title: String,
    pub category: Category,
    pub confidence: u8,
    pub supporting_findings: Vec<String>,
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageData {
    pub mode: TriageMode,
    pub tools_run: Vec<String>,
    pub tools_failed: Vec<String>,
    pub findings: Vec<Finding>,
    pub hypotheses: Vec<Hypothesis>,
    pub executive_summary: String,
    pub recommended_actions: Vec<String>,
}

/// One entry in the root-cause rule table: if every id in `requires` is
/// present among the merged findings, emit a hypothesis.
struct Rule {
    requires: &'static [&'static str],
    title: &'static str,
    category: Category,
    confidence: u8,
    actions: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        requires: &["dominant_syscall", "cpu_utilization_elevated"],
        title: "excessive syscall overhead is driving CPU usage",
        category: Category::Cpu,
        confidence: 80,
        actions: &[
            "profile the dominant syscall's call sites with perf_thread_profile or perf_offcpu_profile",
            "check whether the dominant syscall can be batched or its call frequency reduced",
        ],
    },
    Rule {
        requires: &["high_syscall_rate", "cpu_utilization_elevated"],
        title: "raw syscall volume is saturating available CPU",
        category: Category::Cpu,
        confidence: 70,
        actions: &["reduce syscall frequency in the hot path", "consider io_uring or batching APIs to cut syscall count"],
    },
    Rule {
        requires: &["thread_cpu_hotspot", "cpu_saturation_elevated"],
        title: "a single thread is monopolizing CPU while other threads wait",
        category: Category::Cpu,
        confidence: 75,
        actions: &["inspect the hotspot thread with perf_cpu_profile", "consider spreading work across more threads"],
    },
    Rule {
        requires: &["memory_pressure_elevated"],
        title: "memory pressure is degrading performance",
        category: Category::Memory,
        confidence: 65,
        actions: &["check for memory leaks with perf_snapshot over an interval", "review cgroup memory limits with perf_cgroup_stat"],
    },
    Rule {
        requires: &["slow_file_ops_detected"],
        title: "slow filesystem operations are on the critical path",
        category: Category::Io,
        confidence: 70,
        actions: &["trace the affected files further with perf_file_trace at a lower threshold", "check the underlying device with perf_disk_stat"],
    },
    Rule {
        requires: &["vfs_layer_active_without_device_pressure"],
        title: "application I/O pattern, not the block device, is the bottleneck",
        category: Category::Io,
        confidence: 60,
        actions: &["review read/write call patterns for excessive small I/O", "consider buffering or caching at the application layer"],
    },
    Rule {
        requires: &["high_process_churn"],
        title: "excessive process fork/exec is consuming resources",
        category: Category::Process,
        confidence: 65,
        actions: &["identify the forking parent with perf_exec_trace", "consider pooling or long-lived workers instead of per-task exec"],
    },
    Rule {
        requires: &["high_connection_fanout"],
        title: "connection fan-out suggests a retry loop or connection storm",
        category: Category::Network,
        confidence: 60,
        actions: &["check for missing connection pooling or a retry loop without backoff", "inspect remote service health"],
    },
    Rule {
        requires: &["short_lived_tcp_connections"],
        title: "connection churn is adding latency overhead",
        category: Category::Network,
        confidence: 55,
        actions: &["enable keep-alive or connection pooling where the protocol allows it"],
    },
];

/// Disk-utilization findings from `perf_io_layers`/`perf_disk_stat` carry a
/// per-device id (`disk_utilization_elevated_<dev>`); the rule table matches
/// on the family, not the literal id.
fn has_disk_pressure(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.id.starts_with("disk_utilization_elevated_"))
}

const DISK_PRESSURE_RULE: Rule = Rule {
    requires: &[],
    title: "a block device is saturated",
    category: Category::Io,
    confidence: 75,
    actions: &["identify the busiest process with perf_fd_trace or perf_file_trace", "check for a runaway write workload with perf_disk_stat"],
};

fn evaluate_rules(findings: &[Finding]) -> Vec<Hypothesis> {
    let ids: std::collections::HashSet<&str> = findings.iter().map(|f| f.id.as_str()).collect();
    let mut hypotheses = Vec::new();

    for rule in RULES {
        if rule.requires.iter().all(|r| ids.contains(r)) {
            let supporting: Vec<String> = findings
                .iter()
                .filter(|f| rule.requires.contains(&f.id.as_str()))
                .map(|f| f.id.clone())
                .collect();
            hypotheses.push(Hypothesis {
                title: rule.title.to_string(),
                category: rule.category,
                confidence: rule.confidence,
                supporting_findings: supporting,
                suggested_actions: rule.actions.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    if has_disk_pressure(findings) {
        let supporting: Vec<String> = findings.iter().filter(|f| f.id.starts_with("disk_utilization_elevated_")).map(|f| f.id.clone()).collect();
        hypotheses.push(Hypothesis {
            title: DISK_PRESSURE_RULE.title.to_string(),
            category: DISK_PRESSURE_RULE.category,
            confidence: DISK_PRESSURE_RULE.confidence,
            supporting_findings: supporting,
            suggested_actions: DISK_PRESSURE_RULE.actions.iter().map(|s| s.to_string()).collect(),
        });
    }

    // A finding with no matching rule still deserves a low-confidence
    // fallback hypothesis so triage never silently drops a warning/critical
    // signal it can't explain.
    let explained: std::collections::HashSet<&str> = hypotheses.iter().flat_map(|h| h.supporting_findings.iter().map(|s| s.as_str())).collect();
    for finding in findings {
        if (finding.severity == Severity::Warning || finding.severity == Severity::Critical) && !explained.contains(finding.id.as_str()) {
            hypotheses.push(Hypothesis {
                title: finding.title.clone(),
                category: finding.category,
                confidence: finding.confidence.min(50),
                supporting_findings: vec![finding.id.clone()],
                suggested_actions: finding.suggestion.clone().into_iter().collect(),
            });
        }
    }

    hypotheses.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    hypotheses
}

/// Top-2 actions from each of the top-3 hypotheses, deduplicated in order of
/// first appearance.
fn recommended_actions(hypotheses: &[Hypothesis]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for hypothesis in hypotheses.iter().take(3) {
        for action in hypothesis.suggested_actions.iter().take(2) {
            if seen.insert(action.clone()) {
                out.push(action.clone());
            }
        }
    }
    out
}

fn executive_summary(mode: TriageMode, tools_failed: &[String], hypotheses: &[Hypothesis]) -> String {
    if hypotheses.is_empty() {
        return format!("{mode:?} triage found no actionable root-cause signal.");
    }
    let top = &hypotheses[0];
    let mut summary = format!("{mode:?} triage: most likely cause is {} ({}% confidence).", top.title, top.confidence);
    if !tools_failed.is_empty() {
        summary.push_str(&format!(" {} subordinate check(s) could not run: {}.", tools_failed.len(), tools_failed.join(", ")));
    }
    summary
}

/// `perf_use_check` reports resource status, not `Finding`s; triage
/// synthesizes findings from its status fields so the rule table has a
/// uniform input.
fn findings_from_use_check(data: &serde_json::Value) -> Vec<Finding> {
    let mut out = Vec::new();
    let status_of = |key: &str| -> Option<Status> { data.get(key)?.get("status").and_then(|s| serde_json::from_value(s.clone()).ok()) };
    let detail_of = |key: &str| -> String { data.get(key).and_then(|r| r.get("detail")).and_then(|d| d.as_str()).unwrap_or("").to_string() };

    if let Some(status) = status_of("cpu") {
        if status >= Status::Warning {
            out.push(make_finding(
                "cpu_utilization_elevated",
                if status == Status::Critical { Severity::Critical } else { Severity::Warning },
                "CPU utilization or saturation is elevated",
                detail_of("cpu"),
                Category::Cpu,
                FindingOpts { confidence: Some(75), ..Default::default() },
            ));
        }
        let saturation = data.get("cpu").and_then(|c| c.get("saturation")).and_then(|v| v.as_f64()).unwrap_or(0.0);
        if saturation >= 1.0 {
            out.push(make_finding(
                "cpu_saturation_elevated",
                Severity::Warning,
                "run queue exceeds available CPUs",
                detail_of("cpu"),
                Category::Cpu,
                FindingOpts { confidence: Some(70), ..Default::default() },
            ));
        }
    }
    if let Some(status) = status_of("memory") {
        if status >= Status::Warning {
            out.push(make_finding(
                "memory_pressure_elevated",
                if status == Status::Critical { Severity::Critical } else { Severity::Warning },
                "memory availability or swap use is elevated",
                detail_of("memory"),
                Category::Memory,
                FindingOpts { confidence: Some(75), ..Default::default() },
            ));
        }
    }
    out
}

fn extract_findings(data: &serde_json::Value) -> Vec<Finding> {
    data.get("findings").and_then(|v| serde_json::from_value::<Vec<Finding>>(v.clone()).ok()).unwrap_or_default()
}

/// Best-effort resolution of `process_name` to a pid by scanning `/proc`.
/// Returns `None` rather than erroring: triage degrades to the
/// process-independent subset of tools when no match is found.
async fn resolve_pid(process_name: &str) -> Option<u32> {
    let mut rd = tokio::fs::read_dir("/proc").await.ok()?;
    while let Ok(Some(entry)) = rd.next_entry().await {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else { continue };
        if let Ok(comm) = tokio::fs::read_to_string(format!("/proc/{pid}/comm")).await {
            if comm.trim() == process_name {
                return Some(pid);
            }
        }
    }
    None
}

pub struct TriageTool;

impl TriageTool {
    /// One subordinate call: runs the named tool, isolates its failure into
    /// `tools_failed` instead of aborting the whole triage.
    async fn run_subordinate(
        tools: &[Box<dyn Tool>],
        deps: &ToolDeps,
        name: &str,
        args: serde_json::Value,
        tools_run: &mut Vec<String>,
        tools_failed: &mut Vec<String>,
        findings: &mut Vec<Finding>,
        evidence: &mut Vec<serde_json::Value>,
    ) {
        let Some(tool) = find(tools, name) else {
            tools_failed.push(name.to_string());
            return;
        };
        tools_run.push(name.to_string());
        let env = tool.run(deps, args).await;
        match env.data {
            Some(data) => {
                findings.extend(if name == "perf_use_check" { findings_from_use_check(&data) } else { extract_findings(&data) });
                evidence.push(serde_json::json!({ "tool": name, "data": data }));
            }
            None => tools_failed.push(name.to_string()),
        }
    }
}

#[async_trait]
impl Tool for TriageTool {
    fn name(&self) -> &'static str {
        "perf_triage"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> Envelope<serde_json::Value> {
        let ctx = deps.envelope_ctx(self.name());
        let input: TriageInput = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string())),
        };
        let mode = input.mode.unwrap_or(TriageMode::Standard);
        let duration = mode.duration_seconds();

        let pid = match input.pid {
            Some(p) if p <= 0 => return ctx.err(ToolError::new(ErrorCode::InvalidPid, "pid must be positive")),
            Some(p) => Some(p as u32),
            None => match &input.process_name {
                Some(name) => resolve_pid(name).await,
                None => None,
            },
        };

        let tools = registry();
        let mut tools_run = Vec::new();
        let mut tools_failed = Vec::new();
        let mut findings = Vec::new();
        let mut evidence = Vec::new();

        // Step 1: always run, regardless of mode or focus.
        Self::run_subordinate(
            &tools,
            deps,
            "perf_snapshot",
            serde_json::json!({}),
            &mut tools_run,
            &mut tools_failed,
            &mut findings,
            &mut evidence,
        )
        .await;
        Self::run_subordinate(
            &tools,
            deps,
            "perf_use_check",
            serde_json::json!({ "duration_seconds": duration.min(5) }),
            &mut tools_run,
            &mut tools_failed,
            &mut findings,
            &mut evidence,
        )
        .await;

        // Step 2: non-quick modes broaden the sweep.
        if mode != TriageMode::Quick {
            if input.focus.gates(Category::Cpu) {
                Self::run_subordinate(
                    &tools,
                    deps,
                    "perf_syscall_count",
                    serde_json::json!({ "duration_seconds": duration, "pid": pid }),
                    &mut tools_run,
                    &mut tools_failed,
                    &mut findings,
                    &mut evidence,
                )
                .await;
                if let Some(pid) = pid {
                    Self::run_subordinate(
                        &tools,
                        deps,
                        "perf_thread_profile",
                        serde_json::json!({ "duration_seconds": duration, "pid": pid }),
                        &mut tools_run,
                        &mut tools_failed,
                        &mut findings,
                        &mut evidence,
                    )
                    .await;
                }
            }
            if input.focus.gates(Category::Io) {
                Self::run_subordinate(
                    &tools,
                    deps,
                    "perf_io_layers",
                    serde_json::json!({ "duration_seconds": duration.min(10) }),
                    &mut tools_run,
                    &mut tools_failed,
                    &mut findings,
                    &mut evidence,
                )
                .await;
            }
        }

        // Step 3: deep mode adds the slower, more invasive tracers.
        if mode == TriageMode::Deep {
            if input.focus.gates(Category::Io) {
                Self::run_subordinate(
                    &tools,
                    deps,
                    "perf_file_trace",
                    serde_json::json!({ "duration_seconds": duration, "pid": pid }),
                    &mut tools_run,
                    &mut tools_failed,
                    &mut findings,
                    &mut evidence,
                )
                .await;
            }
            if input.include_exec_trace && input.focus.gates(Category::Process) {
                Self::run_subordinate(
                    &tools,
                    deps,
                    "perf_exec_trace",
                    serde_json::json!({ "duration_seconds": duration }),
                    &mut tools_run,
                    &mut tools_failed,
                    &mut findings,
                    &mut evidence,
                )
                .await;
            }
        }

        let findings = dedup_keep_highest_severity(findings);
        let hypotheses = evaluate_rules(&findings);
        let actions = recommended_actions(&hypotheses);
        let summary = executive_summary(mode, &tools_failed, &hypotheses);

        let data = TriageData {
            mode,
            tools_run,
            tools_failed,
            findings,
            hypotheses,
            executive_summary: summary,
            recommended_actions: actions,
        };
        let mut value = serde_json::to_value(&data).unwrap();
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert("evidence".to_string(), serde_json::Value::Array(evidence));
        }
        ctx.ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, severity: Severity, category: Category) -> Finding {
        make_finding(id, severity, id, "detail", category, FindingOpts { confidence: Some(80), ..Default::default() })
    }

    /// S6 — standard triage, CPU idle 5% + futex dominating syscalls, must
    /// surface a CPU-category hypothesis citing both signals.
    #[test]
    fn s6_dominant_syscall_plus_cpu_pressure_yields_cpu_hypothesis() {
        let findings = vec![
            finding("dominant_syscall", Severity::Info, Category::Cpu),
            finding("cpu_utilization_elevated", Severity::Warning, Category::Cpu),
        ];
        let hypotheses = evaluate_rules(&findings);
        let cpu_hypothesis = hypotheses.iter().find(|h| h.category == Category::Cpu).expect("expected a cpu hypothesis");
        assert!(cpu_hypothesis.supporting_findings.contains(&"dominant_syscall".to_string()));
        assert!(cpu_hypothesis.supporting_findings.contains(&"cpu_utilization_elevated".to_string()));
    }

    #[test]
    fn unexplained_critical_finding_still_produces_a_fallback_hypothesis() {
        let findings = vec![finding("mystery_critical", Severity::Critical, Category::Other)];
        let hypotheses = evaluate_rules(&findings);
        assert_eq!(hypotheses.len(), 1);
        assert_eq!(hypotheses[0].confidence, 50);
    }

    #[test]
    fn recommended_actions_are_deduplicated_and_ordered() {
        let hypotheses = vec![
            Hypothesis {
                title: "a".into(),
                category: Category::Cpu,
                confidence: 90,
                supporting_findings: vec![],
                suggested_actions: vec!["shared".into(), "only-a".into()],
            },
            Hypothesis {
                title: "b".into(),
                category: Category::Io,
                confidence: 80,
                supporting_findings: vec![],
                suggested_actions: vec!["shared".into(), "only-b".into()],
            },
        ];
        let actions = recommended_actions(&hypotheses);
        assert_eq!(actions, vec!["shared".to_string(), "only-a".to_string(), "only-b".to_string()]);
    }

    #[test]
    fn quick_mode_has_the_shortest_duration() {
        assert!(TriageMode::Quick.duration_seconds() < TriageMode::Standard.duration_seconds());
        assert!(TriageMode::Standard.duration_seconds() < TriageMode::Deep.duration_seconds());
    }
}
