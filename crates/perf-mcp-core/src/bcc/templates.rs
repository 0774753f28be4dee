//! Embedded bpftrace fallback scripts.
//!
//! Every template is a fixed string with `{placeholder}` interpolation
//! points; each point takes a single validated numeric or enum value from a
//! closed grammar, never raw request text. Templates never concatenate
//! user-supplied strings into the script body.

use crate::parsers::{to_microseconds, LatencyUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpftraceTarget {
    BioLatencyLog2,
    BioLatencyLinear,
    RunqLatencyLog2,
    SyscallCount,
}

#[derive(Debug, Clone)]
pub struct BpftraceParams {
    pub duration_seconds: u32,
    pub linear_bucket_ms: Option<u32>,
    pub min_latency_ms: Option<u32>,
    pub pid_filter: Option<u32>,
}

fn pid_guard(pid_filter: Option<u32>) -> String {
    match pid_filter {
        Some(pid) => format!("/pid == {pid}/"),
        None => String::new(),
    }
}

/// Renders the fixed template for `target` with `params`. `duration_seconds`
/// must already be validated to the tool's 1-60s range by the caller; this
/// function does not re-validate (single-purpose template renderer only).
pub fn render(target: BpftraceTarget, params: &BpftraceParams) -> String {
    let guard = pid_guard(params.pid_filter);
    match target {
        BpftraceTarget::BioLatencyLog2 => format!(
            "kprobe:blk_account_io_start {{ @start[arg0] = nsecs; }}\n\
             kprobe:blk_account_io_done {guard}\n\
             {{ if (@start[arg0]) {{ @usecs = hist((nsecs - @start[arg0]) / 1000); delete(@start[arg0]); }} }}\n\
             interval:s:{dur} {{ exit(); }}",
            dur = params.duration_seconds,
        ),
        BpftraceTarget::BioLatencyLinear => {
            // Bucket width arrives in ms (the tool's own unit for this
            // input); scale it to the histogram's canonical microseconds
            // before it reaches the script, same as the range ceiling.
            let bucket_ms = params.linear_bucket_ms.unwrap_or(10);
            let bucket_us = to_microseconds(f64::from(bucket_ms), LatencyUnit::Milliseconds) as u64;
            let max_us = to_microseconds(1000.0, LatencyUnit::Milliseconds) as u64;
            format!(
                "kprobe:blk_account_io_start {{ @start[arg0] = nsecs; }}\n\
                 kprobe:blk_account_io_done {guard}\n\
                 {{ if (@start[arg0]) {{ @usecs = lhist((nsecs - @start[arg0]) / 1000, 0, {max_us}, {bucket_us}); delete(@start[arg0]); }} }}\n\
                 interval:s:{dur} {{ exit(); }}",
                dur = params.duration_seconds,
            )
        }
        BpftraceTarget::RunqLatencyLog2 => format!(
            "tracepoint:sched:sched_wakeup,tracepoint:sched:sched_wakeup_new\n\
             {{ @qtime[args.pid] = nsecs; }}\n\
             tracepoint:sched:sched_switch\n\
             {{ if (@qtime[args.next_pid]) {{ @usecs = hist((nsecs - @qtime[args.next_pid]) / 1000); delete(@qtime[args.next_pid]); }} }}\n\
             interval:s:{dur} {{ exit(); }}",
            dur = params.duration_seconds,
        ),
        BpftraceTarget::SyscallCount => format!(
            "tracepoint:raw_syscalls:sys_enter {guard} {{ @[probe] = count(); }}\n\
             interval:s:{dur} {{ exit(); }}",
            dur = params.duration_seconds,
        ),
    }
}

/// A bpftrace invocation is always `bpftrace -e <script>` — exactly one
/// allow-listed shape.
pub fn argv_for(script: String) -> Vec<String> {
    vec!["-e".to_string(), script]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bio_latency_linear_embeds_validated_bucket_width_in_microseconds() {
        let params = BpftraceParams { duration_seconds: 5, linear_bucket_ms: Some(10), min_latency_ms: None, pid_filter: None };
        let script = render(BpftraceTarget::BioLatencyLinear, &params);
        assert!(script.contains("lhist((nsecs - @start[arg0]) / 1000, 0, 1000000, 10000)"));
        assert!(script.contains("interval:s:5"));
    }

    #[test]
    fn pid_filter_renders_as_a_guard_not_concatenated_text() {
        let params = BpftraceParams { duration_seconds: 2, linear_bucket_ms: None, min_latency_ms: None, pid_filter: Some(4242) };
        let script = render(BpftraceTarget::BioLatencyLog2, &params);
        assert!(script.contains("/pid == 4242/"));
    }
}
