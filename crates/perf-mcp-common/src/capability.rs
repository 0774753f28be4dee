use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelInfo {
    pub version: String,
    pub major: u32,
    pub minor: u32,
}

/// The closed set of external observability executables the server knows
/// how to check for and invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownTool {
    Perf,
    Bpftool,
    Bpftrace,
    Iostat,
    Vmstat,
    Sar,
    Ss,
    Nstat,
}

impl KnownTool {
    pub const ALL: [KnownTool; 8] = [
        KnownTool::Perf,
        KnownTool::Bpftool,
        KnownTool::Bpftrace,
        KnownTool::Iostat,
        KnownTool::Vmstat,
        KnownTool::Sar,
        KnownTool::Ss,
        KnownTool::Nstat,
    ];
}

/// Closed set of ~15 BCC tool names the runtime knows how to preflight,
/// compile-time-estimate, and (on failure) fall back away from.
pub const BCC_TOOL_NAMES: [&str; 15] = [
    "biolatency",
    "runqlat",
    "tcplife",
    "tcpconnect",
    "execsnoop",
    "syscount",
    "gethostlatency",
    "filelife",
    "fileslower",
    "opensnoop",
    "vfsstat",
    "offcputime",
    "cachestat",
    "biotop",
    "biosnoop",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub is_root: bool,
    pub perf_event_paranoid: i32,
    pub can_run_perf: bool,
    pub can_run_bpf: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CgroupVersion {
    V1,
    V2,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Features {
    pub has_btf: bool,
    pub has_psi: bool,
    pub cgroup_version: Option<CgroupVersion>,
    pub thp_enabled: bool,
    /// Resolved path to the C library, used by uprobe-based bpftrace
    /// fallback templates. `None` means those fallbacks are unavailable.
    pub libc_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Virtualization {
    None,
    Kvm,
    Xen,
    Vmware,
    Hyperv,
    Docker,
    Lxc,
    Podman,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub is_container: bool,
    pub virtualization: Virtualization,
    pub cpu_count: usize,
    pub numa_nodes: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            is_container: false,
            virtualization: Virtualization::Unknown,
            cpu_count: 1,
            numa_nodes: 1,
        }
    }
}

/// Immutable once-per-process snapshot of what this host can do. Created
/// lazily on first use and cached — no per-call re-probing — and
/// injectable directly in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    pub kernel: KernelInfo,
    pub tools: BTreeMap<KnownTool, bool>,
    pub bcc_tools: BTreeMap<String, bool>,
    pub permissions: Permissions,
    pub features: Features,
    pub environment: Environment,
    pub hostname: String,
}

impl CapabilitySnapshot {
    pub fn has_tool(&self, tool: KnownTool) -> bool {
        self.tools.get(&tool).copied().unwrap_or(false)
    }

    pub fn has_bcc_tool(&self, name: &str) -> bool {
        self.bcc_tools.get(name).copied().unwrap_or(false)
    }

    pub fn has_any_bcc_tool(&self) -> bool {
        self.bcc_tools.values().any(|present| *present)
    }
}
