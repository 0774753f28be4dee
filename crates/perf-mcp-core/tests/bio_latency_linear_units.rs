//! S3 — `bio_latency` with `histogram_type="linear", linear_bucket_ms=10`
//! must produce a histogram whose bucket width equals `10 * 1000` = 10000
//! microseconds. This drives the real `BioLatencyLinear` template (not a
//! synthetic fixture) through the real linear-histogram parser, so a future
//! unit drifting back to milliseconds would be caught here even though
//! nothing actually shells out to `bpftrace`.

use perf_mcp_core::bcc::templates::{render, BpftraceParams, BpftraceTarget};
use perf_mcp_core::parsers::bpftrace::{bucket_width, parse_linear_histogram};

#[test]
fn rendered_linear_template_matches_its_own_bucket_width_in_microseconds() {
    let bucket_ms = 10u32;
    let expected_step_us = u64::from(bucket_ms) * 1000;
    let params = BpftraceParams { duration_seconds: 5, linear_bucket_ms: Some(bucket_ms), min_latency_ms: None, pid_filter: None };
    let script = render(BpftraceTarget::BioLatencyLinear, &params);

    // The template must bucket an `@usecs`-labelled histogram in
    // microsecond-wide steps, not millisecond-wide ones.
    let expected_call = format!("lhist((nsecs - @start[arg0]) / 1000, 0, 1000000, {expected_step_us})");
    assert!(script.contains(&expected_call), "expected {expected_call:?} in rendered script:\n{script}");
    assert!(script.contains("@usecs ="), "histogram variable should be labelled in microseconds");

    // A real bpftrace process running this exact script would print rows
    // whose range matches that same step; simulate that output and confirm
    // the parser recovers the same width S3 names.
    let simulated_output = format!(
        "[0, {expected_step_us})              3 |@@@                                                 |\n\
         [{expected_step_us}, {double})          9 |@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@            |\n",
        double = expected_step_us * 2,
    );
    let buckets = parse_linear_histogram(&simulated_output).unwrap();
    assert_eq!(bucket_width(&buckets), Some(expected_step_us as f64));
}
