//! Allow-list & path policy.
//!
//! Two compile-time static tables plus two pure predicates
//! (`argv_permitted`, `path_readable`). No deviation from these tables is
//! possible at run time.

use regex::Regex;
use std::sync::OnceLock;

/// A permitted executable: its allow-list key, its absolute path, the flags
/// it may be passed, and whether bare numeric tokens (durations, intervals,
/// counts) are acceptable as argv entries.
#[derive(Debug, Clone, Copy)]
pub struct AllowlistEntry {
    pub key: &'static str,
    pub absolute_path: &'static str,
    pub permitted_flags: &'static [&'static str],
    pub accepts_numeric_args: bool,
    /// If set, the argv token immediately following this flag is a
    /// rendered template body (e.g. bpftrace's `-e <script>`) and is exempt
    /// from the generic flag/numeric/path/alphanumeric character check —
    /// it still goes through the parent-traversal check. Scripts reaching
    /// this path are assembled by the closed template renderer from
    /// validated numeric/string placeholders, never concatenated directly
    /// from request fields, so the character-level filter would only
    /// reject legitimate bpftrace syntax (`{`, `;`, `@`) without adding
    /// protection.
    pub script_value_flag: Option<&'static str>,
}

/// The closed set of spawnable executables. Paths reflect common
/// Debian/Ubuntu/RHEL locations; a missing binary surfaces as
/// `TOOL_NOT_FOUND` at spawn time, not as an allow-list violation.
pub const ALLOWLIST: &[AllowlistEntry] = &[
    AllowlistEntry {
        key: "perf",
        absolute_path: "/usr/bin/perf",
        permitted_flags: &[
            "record", "report", "sched", "stat", "script", "--stdio", "latency", "timehist",
            "-F", "-g", "-a", "-p", "-o", "-i", "--no-children", "-e", "-q",
        ],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "bpftrace",
        absolute_path: "/usr/bin/bpftrace",
        permitted_flags: &["-e", "-p", "-c", "--unsafe"],
        accepts_numeric_args: true,
        script_value_flag: Some("-e"),
    },
    AllowlistEntry {
        key: "bpftool",
        absolute_path: "/usr/sbin/bpftool",
        permitted_flags: &["prog", "map", "list", "-j"],
        accepts_numeric_args: false,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "iostat",
        absolute_path: "/usr/bin/iostat",
        permitted_flags: &["-x", "-z", "-d", "-c", "-k", "-t"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "vmstat",
        absolute_path: "/usr/bin/vmstat",
        permitted_flags: &["-s", "-d", "-a"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "sar",
        absolute_path: "/usr/bin/sar",
        permitted_flags: &["-u", "-r", "-n", "-d", "-q", "DEV"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "ss",
        absolute_path: "/usr/sbin/ss",
        permitted_flags: &["-s", "-t", "-n", "-a", "-p", "-i", "-u", "-l"],
        accepts_numeric_args: false,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "nstat",
        absolute_path: "/usr/bin/nstat",
        permitted_flags: &["-a", "-z"],
        accepts_numeric_args: false,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "biolatency",
        absolute_path: "/usr/sbin/biolatency-bpfcc",
        permitted_flags: &["-m", "-D", "-T"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "runqlat",
        absolute_path: "/usr/sbin/runqlat-bpfcc",
        permitted_flags: &["-m", "-P", "-T"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "tcplife",
        absolute_path: "/usr/sbin/tcplife-bpfcc",
        permitted_flags: &["-p"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "tcpconnect",
        absolute_path: "/usr/sbin/tcpconnect-bpfcc",
        permitted_flags: &["-p", "-t"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "execsnoop",
        absolute_path: "/usr/sbin/execsnoop-bpfcc",
        permitted_flags: &["-t", "-x"],
        accepts_numeric_args: false,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "syscount",
        absolute_path: "/usr/sbin/syscount-bpfcc",
        permitted_flags: &["-p", "-d", "-L", "-T"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "gethostlatency",
        absolute_path: "/usr/sbin/gethostlatency-bpfcc",
        permitted_flags: &["-p"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "filelife",
        absolute_path: "/usr/sbin/filelife-bpfcc",
        permitted_flags: &["-p"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "fileslower",
        absolute_path: "/usr/sbin/fileslower-bpfcc",
        permitted_flags: &["-p"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "opensnoop",
        absolute_path: "/usr/sbin/opensnoop-bpfcc",
        permitted_flags: &["-p", "-d", "-T"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "vfsstat",
        absolute_path: "/usr/sbin/vfsstat-bpfcc",
        permitted_flags: &[],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
    AllowlistEntry {
        key: "offcputime",
        absolute_path: "/usr/sbin/offcputime-bpfcc",
        permitted_flags: &["-p", "-f", "-m"],
        accepts_numeric_args: true,
        script_value_flag: None,
    },
];

pub fn lookup(key: &str) -> Option<&'static AllowlistEntry> {
    ALLOWLIST.iter().find(|e| e.key == key)
}

fn looks_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn has_parent_traversal(token: &str) -> bool {
    token.split('/').any(|segment| segment == "..")
}

/// Pure predicate: is this argv vector permitted for the given allow-list
/// key? Every token must be either a permitted flag, a numeric literal (if
/// the entry allows them), or a path that itself passes [`path_readable`]
/// (so tools that take a target path, e.g. `perf -i <file>`, stay bounded).
/// Rejects on any `..` path segment anywhere in argv.
pub fn argv_permitted(key: &str, argv: &[String]) -> bool {
    let Some(entry) = lookup(key) else { return false };

    let mut expect_script_body = false;
    for token in argv {
        if has_parent_traversal(token) {
            return false;
        }
        if expect_script_body {
            expect_script_body = false;
            continue;
        }
        if entry.permitted_flags.contains(&token.as_str()) {
            if entry.script_value_flag == Some(token.as_str()) {
                expect_script_body = true;
            }
            continue;
        }
        if entry.accepts_numeric_args && looks_numeric(token) {
            continue;
        }
        if token.starts_with('/') {
            // A value that itself looks like a path must satisfy the path
            // policy (e.g. perf -i /tmp/perf-mcp/artifacts/<uuid>.data).
            if path_readable(token) {
                continue;
            }
            return false;
        }
        // Anything else (a bare word that is neither a flag, a number, nor
        // a path) is only permitted if it is a short alphanumeric token —
        // e.g. bpftrace PID filters, process names for -p/-c arguments —
        // and never contains shell metacharacters.
        if !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ':') {
            return false;
        }
    }
    true
}

fn proc_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^/proc/(",
            r"stat|loadavg|meminfo|vmstat|cpuinfo|diskstats|version|sys/kernel/perf_event_paranoid",
            r"|net/dev|net/snmp|net/tcp|net/udp",
            r"|pressure/(cpu|memory|io)",
            r"|\d+/(cgroup|fd/?.*|status|stat|cmdline|comm|net/dev|net/tcp|net/udp)",
            r"|1/cgroup",
            r")$"
        ))
        .expect("static proc path regex must compile")
    })
}

fn sys_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^/sys/(",
            r"fs/cgroup(/[A-Za-z0-9_./-]+)?/(cpu\.stat|cpu\.max|memory\.[a-z.]+|io\.stat|pids\.[a-z]+|cgroup\.controllers)",
            r"|fs/cgroup/cgroup.controllers",
            r"|block/[A-Za-z0-9]+/stat",
            r"|devices/system/cpu/cpu\d+/cpufreq/scaling_cur_freq",
            r"|devices/system/node",
            r"|devices/system/node/node\d+",
            r"|kernel/btf/vmlinux",
            r"|class/dmi/id/(product_name|sys_vendor|bios_vendor)",
            r")$"
        ))
        .expect("static sys path regex must compile")
    })
}

/// Artifact store paths: `perf record` output
/// files and their derived folded-stack siblings, confined to a single
/// directory and a fixed set of extensions so no other part of the
/// filesystem becomes reachable through a profiler's `-o`/`-i` argument.
fn artifact_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^/tmp/perf-mcp/artifacts/[A-Za-z0-9_-]+\.(data|folded|script)$")
            .expect("static artifact path regex must compile")
    })
}

/// Pure predicate: is this path readable under the policy? Rejects any `..`
/// segment before checking any regex set. Artifact paths are included
/// here, not just `/proc`/`/sys`, since the same predicate gates both
/// read targets (`perf -i`) and write targets (`perf record -o`).
pub fn path_readable(path: &str) -> bool {
    if has_parent_traversal(path) {
        return false;
    }
    proc_path_regex().is_match(path) || sys_path_regex().is_match(path) || artifact_path_regex().is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_never_permitted() {
        assert!(!argv_permitted("rm", &["-rf".to_string(), "/".to_string()]));
    }

    #[test]
    fn unpermitted_flag_is_rejected() {
        assert!(!argv_permitted("iostat", &["--evil".to_string()]));
    }

    #[test]
    fn permitted_flags_and_numbers_pass() {
        assert!(argv_permitted("iostat", &["-x".to_string(), "-z".to_string(), "1".to_string(), "2".to_string()]));
    }

    #[test]
    fn parent_traversal_is_always_rejected() {
        assert!(!argv_permitted("perf", &["-i".to_string(), "/tmp/../etc/shadow".to_string()]));
        assert!(!path_readable("/proc/../etc/shadow"));
    }

    #[test]
    fn bpftrace_script_bodies_pass_the_character_filter_after_dash_e() {
        let script = "kprobe:blk_account_io_start { @start[arg0] = nsecs; }\ninterval:s:5 { exit(); }".to_string();
        assert!(argv_permitted("bpftrace", &["-e".to_string(), script]));
    }

    #[test]
    fn a_script_like_token_without_a_preceding_dash_e_is_still_rejected() {
        let script = "kprobe:blk_account_io_start { @start[arg0] = nsecs; }".to_string();
        assert!(!argv_permitted("bpftrace", &[script]));
    }

    #[test]
    fn parent_traversal_inside_a_bpftrace_script_body_is_still_rejected() {
        assert!(!argv_permitted("bpftrace", &["-e".to_string(), "cat /tmp/../etc/shadow".to_string()]));
    }

    #[test]
    fn proc_aggregate_paths_are_readable() {
        assert!(path_readable("/proc/stat"));
        assert!(path_readable("/proc/meminfo"));
        assert!(path_readable("/proc/pressure/cpu"));
    }

    #[test]
    fn proc_per_pid_paths_are_readable() {
        assert!(path_readable("/proc/1234/cgroup"));
        assert!(path_readable("/proc/1234/status"));
    }

    #[test]
    fn arbitrary_etc_paths_are_not_readable() {
        assert!(!path_readable("/etc/shadow"));
        assert!(!path_readable("/home/user/.ssh/id_rsa"));
    }

    #[test]
    fn sys_cgroup_controller_files_are_readable() {
        assert!(path_readable("/sys/fs/cgroup/cpu.stat"));
        assert!(path_readable("/sys/fs/cgroup/user.slice/memory.current"));
    }

    #[test]
    fn artifact_store_paths_are_readable_and_writable() {
        assert!(path_readable("/tmp/perf-mcp/artifacts/5f0b2b2e-cpu.data"));
        assert!(path_readable("/tmp/perf-mcp/artifacts/5f0b2b2e-cpu.folded"));
        assert!(!path_readable("/tmp/perf-mcp/artifacts/../etc/shadow"));
        assert!(!path_readable("/tmp/other-dir/file.data"));
    }
}
