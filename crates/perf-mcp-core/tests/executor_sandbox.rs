use perf_mcp_core::executor::{ExecRequest, Executor};
use perf_mcp_common::ErrorCode;

#[tokio::test]
async fn refuses_a_key_absent_from_the_allow_list() {
    let exec = Executor::new();
    let res = exec
        .exec(ExecRequest {
            key: "bash".to_string(),
            argv: vec!["-c".to_string(), "echo hi".to_string()],
            timeout_ms: 1000,
            max_output_bytes: 4096,
            profiler_class: false,
        })
        .await;
    assert!(!res.success);
    assert_eq!(res.error.unwrap().code, ErrorCode::ToolNotFound);
    assert_eq!(res.exit_code, None);
}

#[tokio::test]
async fn refuses_parent_traversal_in_argv() {
    let exec = Executor::new();
    let res = exec
        .exec(ExecRequest {
            key: "perf".to_string(),
            argv: vec!["-i".to_string(), "/tmp/perf-mcp/artifacts/../../etc/shadow".to_string()],
            timeout_ms: 1000,
            max_output_bytes: 4096,
            profiler_class: false,
        })
        .await;
    assert!(!res.success);
    assert_eq!(res.error.unwrap().code, ErrorCode::InvalidParams);
}

#[tokio::test]
async fn a_permitted_command_runs_and_captures_output() {
    let exec = Executor::new();
    let res = exec
        .exec(ExecRequest {
            key: "vmstat".to_string(),
            argv: vec!["-s".to_string()],
            timeout_ms: 5000,
            max_output_bytes: 65536,
            profiler_class: false,
        })
        .await;
    // vmstat may not be installed on the machine running this test; either
    // outcome is acceptable as long as the sandboxing itself didn't block it.
    if res.success {
        assert!(!res.stdout.is_empty());
        assert!(res.error.is_none());
    } else {
        assert_eq!(res.error.unwrap().code, ErrorCode::ToolNotFound);
    }
}

#[tokio::test]
async fn a_command_exceeding_its_deadline_is_killed_and_reports_timeout() {
    let exec = Executor::new();
    // bpftrace is allow-listed and its "-e" argument is exempt from the
    // generic character filter (it carries a rendered script body, not
    // free-form argv). Since bpftrace may be absent on the test host, this
    // only asserts the outcome is a clean timeout or tool-not-found, never
    // a hang past the deadline plus generous escalation slack.
    let started = std::time::Instant::now();
    let res = exec
        .exec(ExecRequest {
            key: "bpftrace".to_string(),
            argv: vec!["-e".to_string(), "BEGIN { printf(\"x\"); }".to_string()],
            timeout_ms: 50,
            max_output_bytes: 4096,
            profiler_class: false,
        })
        .await;
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    if let Some(err) = res.error {
        assert!(matches!(err.code, ErrorCode::Timeout | ErrorCode::ToolNotFound | ErrorCode::ExecutionFailed));
    }
}

#[tokio::test]
async fn profiler_class_calls_are_serialized_through_the_gate() {
    let exec = std::sync::Arc::new(Executor::new());
    let make_req = || ExecRequest {
        key: "vmstat".to_string(),
        argv: vec!["-s".to_string()],
        timeout_ms: 2000,
        max_output_bytes: 4096,
        profiler_class: true,
    };

    let exec_a = exec.clone();
    let exec_b = exec.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { exec_a.exec(make_req()).await }),
        tokio::spawn(async move { exec_b.exec(make_req()).await }),
    );
    // Both complete; the gate only guarantees exclusivity, not that both
    // succeed (vmstat may be missing on the test host).
    assert!(a.is_ok());
    assert!(b.is_ok());
}
