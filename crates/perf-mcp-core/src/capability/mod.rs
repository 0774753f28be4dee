//! Capability detector.
//!
//! One-shot probe of kernel version, tool availability, paranoid level,
//! BTF, PSI, cgroup version, containerization, CPU/NUMA topology, and BCC
//! tool presence. Results are materialised into a single immutable
//! snapshot and cached behind a `OnceLock`; tests inject an alternate
//! snapshot directly rather than going through the cache.

mod detect;

pub use detect::detect_now;

use perf_mcp_common::CapabilitySnapshot;
use std::sync::OnceLock;

static SNAPSHOT: OnceLock<CapabilitySnapshot> = OnceLock::new();

/// Returns the process-wide capability snapshot, detecting it on first
/// call. Written once, read freely thereafter.
pub async fn snapshot() -> &'static CapabilitySnapshot {
    if let Some(existing) = SNAPSHOT.get() {
        return existing;
    }
    let detected = detect_now().await;
    SNAPSHOT.get_or_init(|| detected)
}
