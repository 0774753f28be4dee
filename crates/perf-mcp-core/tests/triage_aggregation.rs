use perf_mcp_common::capability::CapabilitySnapshot;
use perf_mcp_core::tools::ToolDeps;
use perf_mcp_core::Tool;

fn deps(tmp: &tempfile::TempDir) -> ToolDeps {
    ToolDeps::new(CapabilitySnapshot::default(), tmp.path().to_path_buf(), "0.1.0-test")
}

#[tokio::test]
async fn quick_mode_always_runs_snapshot_and_use_check() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = deps(&tmp);
    let tool = perf_mcp_core::TriageTool;

    let envelope = tool.run(&deps, serde_json::json!({ "mode": "quick" })).await;

    assert!(envelope.success);
    let data = envelope.data.expect("quick triage must produce data");
    let tools_run: Vec<String> = serde_json::from_value(data["tools_run"].clone()).unwrap();
    assert!(tools_run.contains(&"perf_snapshot".to_string()));
    assert!(tools_run.contains(&"perf_use_check".to_string()));

    // Quick mode must not broaden the sweep beyond the two always-run tools.
    assert!(!tools_run.contains(&"perf_io_layers".to_string()));
    assert!(!tools_run.contains(&"perf_file_trace".to_string()));
}

#[tokio::test]
async fn an_unresolvable_process_name_degrades_gracefully_instead_of_erroring() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = deps(&tmp);
    let tool = perf_mcp_core::TriageTool;

    let envelope = tool
        .run(&deps, serde_json::json!({ "mode": "quick", "process_name": "definitely-not-a-real-process-xyz" }))
        .await;

    assert!(envelope.success);
    assert!(envelope.error.is_none());
}

#[tokio::test]
async fn a_non_positive_pid_is_rejected_before_any_subordinate_call() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = deps(&tmp);
    let tool = perf_mcp_core::TriageTool;

    let envelope = tool.run(&deps, serde_json::json!({ "mode": "quick", "pid": 0 })).await;

    assert!(!envelope.success);
    assert_eq!(envelope.error.unwrap().code, perf_mcp_common::ErrorCode::InvalidPid);
}

#[tokio::test]
async fn output_shape_carries_an_executive_summary_and_deduplicated_actions() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = deps(&tmp);
    let tool = perf_mcp_core::TriageTool;

    let envelope = tool.run(&deps, serde_json::json!({ "mode": "quick" })).await;

    assert!(envelope.success);
    let data = envelope.data.expect("quick triage must produce data");
    assert!(data["executive_summary"].as_str().unwrap_or("").len() > 0);
    assert!(data["hypotheses"].is_array());
    assert!(data["findings"].is_array());

    let actions: Vec<String> = serde_json::from_value(data["recommended_actions"].clone()).unwrap();
    let mut deduped = actions.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(actions.len(), deduped.len(), "recommended_actions must not repeat an action");

    // `evidence` is spliced in alongside the typed TriageData fields.
    assert!(data["evidence"].is_array());
}

#[tokio::test]
async fn malformed_input_produces_an_error_envelope() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = deps(&tmp);
    let tool = perf_mcp_core::TriageTool;

    let envelope = tool.run(&deps, serde_json::json!({ "mode": "glacial" })).await;

    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error.unwrap().code, perf_mcp_common::ErrorCode::InvalidParams);
}
