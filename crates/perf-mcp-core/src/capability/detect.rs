use crate::allowlist::lookup;
use perf_mcp_common::capability::{
    CgroupVersion, Environment, Features, KernelInfo, KnownTool, Permissions, Virtualization,
    BCC_TOOL_NAMES,
};
use perf_mcp_common::CapabilitySnapshot;
use std::collections::BTreeMap;
use std::path::Path;

/// Runs every sub-probe concurrently and materialises one snapshot. Must
/// not fail: any sub-probe error sets a conservative default and the
/// snapshot still completes.
pub async fn detect_now() -> CapabilitySnapshot {
    let (kernel, tools, bcc_tools, permissions, features, environment, hostname) = tokio::join!(
        detect_kernel(),
        detect_tools(),
        detect_bcc_tools(),
        detect_permissions(),
        detect_features(),
        detect_environment(),
        detect_hostname(),
    );

    CapabilitySnapshot { kernel, tools, bcc_tools, permissions, features, environment, hostname }
}

async fn detect_kernel() -> KernelInfo {
    let raw = tokio::fs::read_to_string("/proc/version").await.unwrap_or_default();
    // "Linux version 6.8.0-45-generic (...) ..."
    let version = raw
        .split_whitespace()
        .nth(2)
        .unwrap_or("0.0.0")
        .split('-')
        .next()
        .unwrap_or("0.0.0")
        .to_string();
    let mut parts = version.split('.');
    let major = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    KernelInfo { version, major, minor }
}

fn executable(path: &str) -> bool {
    #[cfg(unix)]
    {
        nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok()
    }
    #[cfg(not(unix))]
    {
        Path::new(path).exists()
    }
}

async fn detect_tools() -> BTreeMap<KnownTool, bool> {
    let mut map = BTreeMap::new();
    for tool in KnownTool::ALL {
        let key = match tool {
            KnownTool::Perf => "perf",
            KnownTool::Bpftool => "bpftool",
            KnownTool::Bpftrace => "bpftrace",
            KnownTool::Iostat => "iostat",
            KnownTool::Vmstat => "vmstat",
            KnownTool::Sar => "sar",
            KnownTool::Ss => "ss",
            KnownTool::Nstat => "nstat",
        };
        let present = lookup(key).map(|e| executable(e.absolute_path)).unwrap_or(false);
        map.insert(tool, present);
    }
    map
}

async fn detect_bcc_tools() -> BTreeMap<String, bool> {
    let mut map = BTreeMap::new();
    for name in BCC_TOOL_NAMES {
        let present = lookup(name).map(|e| executable(e.absolute_path)).unwrap_or(false);
        map.insert(name.to_string(), present);
    }
    map
}

async fn detect_permissions() -> Permissions {
    let is_root = nix_is_root();
    let paranoid_raw = tokio::fs::read_to_string("/proc/sys/kernel/perf_event_paranoid")
        .await
        .unwrap_or_default();
    let perf_event_paranoid: i32 = paranoid_raw.trim().parse().unwrap_or(4);

    let has_perf = lookup("perf").map(|e| executable(e.absolute_path)).unwrap_or(false);
    // root or a relaxed paranoid level, not CAP_PERFMON/CAP_BPF directly:
    // those bits alone still fail on many distributions without the
    // paranoid-level relaxation too.
    let can_run_perf = has_perf && (is_root || perf_event_paranoid <= 1);

    let has_any_bcc = detect_bcc_tools().await.values().any(|p| *p);
    let can_run_bpf = is_root && has_any_bcc;

    Permissions { is_root, perf_event_paranoid, can_run_perf, can_run_bpf }
}

#[cfg(unix)]
fn nix_is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}
#[cfg(not(unix))]
fn nix_is_root() -> bool {
    false
}

async fn detect_features() -> Features {
    let has_btf = Path::new("/sys/kernel/btf/vmlinux").exists();
    let has_psi = tokio::fs::metadata("/proc/pressure/cpu").await.is_ok();
    let cgroup_version = if Path::new("/sys/fs/cgroup/cgroup.controllers").exists() {
        Some(CgroupVersion::V2)
    } else if Path::new("/sys/fs/cgroup").exists() {
        Some(CgroupVersion::V1)
    } else {
        None
    };
    let thp = tokio::fs::read_to_string("/sys/kernel/mm/transparent_hugepage/enabled")
        .await
        .unwrap_or_default();
    let thp_enabled = thp.contains("[always]") || thp.contains("[madvise]");

    let libc_path = resolve_libc_path();

    Features { has_btf, has_psi, cgroup_version, thp_enabled, libc_path }
}

/// Resolves the C library path once, at capability-detection time, by
/// probing the well-known architecture-specific locations rather than
/// hardcoding a glibc x86_64 triplet. On failure, uprobe-based bpftrace
/// fallbacks report `CAPABILITY_MISSING`.
fn resolve_libc_path() -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "/lib/x86_64-linux-gnu/libc.so.6",
        "/lib/aarch64-linux-gnu/libc.so.6",
        "/lib64/libc.so.6",
        "/usr/lib64/libc.so.6",
        "/lib/libc.so.6",
        "/usr/lib/x86_64-linux-gnu/libc.so.6",
    ];
    CANDIDATES.iter().find(|p| Path::new(p).exists()).map(|p| p.to_string())
}

async fn detect_environment() -> Environment {
    let is_container = tokio::fs::metadata("/.dockerenv").await.is_ok()
        || tokio::fs::read_to_string("/proc/1/cgroup")
            .await
            .map(|s| s.contains("docker") || s.contains("kubepods") || s.contains("lxc"))
            .unwrap_or(false);

    let virtualization = detect_virtualization().await;

    let cpu_count = tokio::fs::read_to_string("/proc/cpuinfo")
        .await
        .map(|s| s.lines().filter(|l| l.starts_with("processor")).count())
        .unwrap_or(1)
        .max(1);

    let numa_nodes = count_numa_nodes().await.max(1);

    Environment { is_container, virtualization, cpu_count, numa_nodes }
}

async fn count_numa_nodes() -> usize {
    let Ok(mut rd) = tokio::fs::read_dir("/sys/devices/system/node").await else {
        return 1;
    };
    let mut count = 0usize;
    while let Ok(Some(entry)) = rd.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with("node") {
            count += 1;
        }
    }
    count
}

async fn detect_virtualization() -> Virtualization {
    if let Ok(vendor) = tokio::fs::read_to_string("/sys/class/dmi/id/sys_vendor").await {
        let v = vendor.to_lowercase();
        if v.contains("kvm") {
            return Virtualization::Kvm;
        }
        if v.contains("vmware") {
            return Virtualization::Vmware;
        }
        if v.contains("xen") {
            return Virtualization::Xen;
        }
        if v.contains("microsoft") {
            return Virtualization::Hyperv;
        }
    }
    if let Ok(cgroup) = tokio::fs::read_to_string("/proc/1/cgroup").await {
        if cgroup.contains("docker") {
            return Virtualization::Docker;
        }
        if cgroup.contains("lxc") {
            return Virtualization::Lxc;
        }
        if cgroup.contains("libpod") || cgroup.contains("podman") {
            return Virtualization::Podman;
        }
    }
    if tokio::fs::metadata("/.dockerenv").await.is_ok() {
        return Virtualization::Docker;
    }
    Virtualization::None
}

async fn detect_hostname() -> String {
    if let Ok(h) = tokio::fs::read_to_string("/proc/sys/kernel/hostname").await {
        let trimmed = h.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    #[cfg(unix)]
    {
        if let Ok(h) = nix::unistd::gethostname() {
            if let Ok(s) = h.into_string() {
                return s;
            }
        }
    }
    "unknown-host".to_string()
}
