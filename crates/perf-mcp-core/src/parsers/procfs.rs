//! Parsers for `/proc/stat`, `/proc/loadavg`, `/proc/meminfo`, `/proc/vmstat`,
//! `/proc/net/dev`, `/proc/net/snmp`, `/proc/pressure/*`, `/proc/<pid>/cgroup`,
//! `/proc/cpuinfo`, and `/proc/diskstats`.

use super::ParseError;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }

    /// Percentage breakdown relative to another (later) sample.
    pub fn utilization_pct_since(&self, later: &CpuTimes) -> CpuUtilizationPct {
        let total_delta = (later.total().saturating_sub(self.total())).max(1) as f64;
        let d = |a: u64, b: u64| (b.saturating_sub(a) as f64 / total_delta) * 100.0;
        CpuUtilizationPct {
            user: d(self.user, later.user),
            system: d(self.system, later.system),
            iowait: d(self.iowait, later.iowait),
            idle: d(self.idle, later.idle),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct CpuUtilizationPct {
    pub user: f64,
    pub system: f64,
    pub iowait: f64,
    pub idle: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub aggregate: CpuTimes,
    pub per_cpu: Vec<CpuTimes>,
    pub ctxt: u64,
    pub processes: u64,
    pub procs_running: u64,
    pub procs_blocked: u64,
}

fn parse_cpu_line(fields: &[&str]) -> CpuTimes {
    let get = |i: usize| fields.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
    CpuTimes {
        user: get(1),
        nice: get(2),
        system: get(3),
        idle: get(4),
        iowait: get(5),
        irq: get(6),
        softirq: get(7),
        steal: get(8),
    }
}

pub fn parse_proc_stat(input: &str) -> Result<ProcStat, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut out = ProcStat::default();
    let mut found_aggregate = false;
    for line in input.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        match fields[0] {
            "cpu" => {
                out.aggregate = parse_cpu_line(&fields);
                found_aggregate = true;
            }
            f if f.starts_with("cpu") => out.per_cpu.push(parse_cpu_line(&fields)),
            "ctxt" => out.ctxt = fields.get(1).and_then(|s| s.parse().ok()).unwrap_or(0),
            "processes" => out.processes = fields.get(1).and_then(|s| s.parse().ok()).unwrap_or(0),
            "procs_running" => out.procs_running = fields.get(1).and_then(|s| s.parse().ok()).unwrap_or(0),
            "procs_blocked" => out.procs_blocked = fields.get(1).and_then(|s| s.parse().ok()).unwrap_or(0),
            _ => {}
        }
    }
    if !found_aggregate {
        return Err(ParseError::UnexpectedFormat("missing aggregate cpu line".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub runnable: u32,
    pub total_threads: u32,
}

pub fn parse_loadavg(input: &str) -> Result<LoadAvg, ParseError> {
    let fields: Vec<&str> = input.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ParseError::NoFields(input.to_string()));
    }
    let (runnable, total_threads) = fields[3]
        .split_once('/')
        .map(|(a, b)| (a.parse().unwrap_or(0), b.parse().unwrap_or(0)))
        .unwrap_or((0, 0));
    Ok(LoadAvg {
        load1: fields[0].parse().unwrap_or(0.0),
        load5: fields[1].parse().unwrap_or(0.0),
        load15: fields[2].parse().unwrap_or(0.0),
        runnable,
        total_threads,
    })
}

pub fn parse_meminfo(input: &str) -> Result<HashMap<String, u64>, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut map = HashMap::new();
    for line in input.lines() {
        let Some((key, rest)) = line.split_once(':') else { continue };
        let value_kb: u64 = rest
            .trim()
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        map.insert(key.trim().to_string(), value_kb);
    }
    Ok(map)
}

/// `available / total * 100`, the USE-method memory metric.
pub fn mem_available_pct(meminfo: &HashMap<String, u64>) -> f64 {
    let total = *meminfo.get("MemTotal").unwrap_or(&1).max(&1);
    let available = meminfo.get("MemAvailable").copied().unwrap_or(0);
    (available as f64 / total as f64) * 100.0
}

pub fn swap_used_pct(meminfo: &HashMap<String, u64>) -> f64 {
    let total = *meminfo.get("SwapTotal").unwrap_or(&0);
    if total == 0 {
        return 0.0;
    }
    let free = meminfo.get("SwapFree").copied().unwrap_or(0);
    ((total - free.min(total)) as f64 / total as f64) * 100.0
}

pub fn parse_vmstat(input: &str) -> Result<HashMap<String, i64>, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut map = HashMap::new();
    for line in input.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(k), Some(v)) = (parts.next(), parts.next()) {
            if let Ok(v) = v.parse() {
                map.insert(k.to_string(), v);
            }
        }
    }
    Ok(map)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevCounters {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_drops: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_drops: u64,
}

pub fn parse_net_dev(input: &str) -> Result<HashMap<String, NetDevCounters>, ParseError> {
    let mut map = HashMap::new();
    for line in input.lines().skip(2) {
        let Some((iface, rest)) = line.split_once(':') else { continue };
        let fields: Vec<u64> = rest.split_whitespace().filter_map(|f| f.parse().ok()).collect();
        if fields.len() < 16 {
            continue;
        }
        map.insert(
            iface.trim().to_string(),
            NetDevCounters {
                rx_bytes: fields[0],
                rx_packets: fields[1],
                rx_errors: fields[2],
                rx_drops: fields[3],
                tx_bytes: fields[8],
                tx_packets: fields[9],
                tx_errors: fields[10],
                tx_drops: fields[11],
            },
        );
    }
    if map.is_empty() {
        return Err(ParseError::UnexpectedFormat(input.lines().take(1).collect()));
    }
    Ok(map)
}

/// `/proc/net/snmp` pairs a header row with a value row per protocol block
/// (e.g. `Tcp: ... \n Tcp: ...`); this returns protocol -> field -> value.
pub fn parse_net_snmp(input: &str) -> Result<HashMap<String, HashMap<String, i64>>, ParseError> {
    let mut out: HashMap<String, HashMap<String, i64>> = HashMap::new();
    let mut lines = input.lines().peekable();
    while let Some(header) = lines.next() {
        let Some((proto, fields)) = header.split_once(':') else { continue };
        let Some(values_line) = lines.next() else { break };
        let Some((_, values)) = values_line.split_once(':') else { continue };
        let names: Vec<&str> = fields.split_whitespace().collect();
        let vals: Vec<i64> = values.split_whitespace().filter_map(|v| v.parse().ok()).collect();
        let entry = out.entry(proto.trim().to_string()).or_default();
        for (name, val) in names.iter().zip(vals.iter()) {
            entry.insert((*name).to_string(), *val);
        }
    }
    if out.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PsiLine {
    pub avg10: f64,
    pub avg60: f64,
    pub avg300: f64,
    pub total_usec: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PsiMetric {
    pub some: PsiLine,
    pub full: Option<PsiLine>,
}

fn parse_psi_line(line: &str) -> Option<(String, PsiLine)> {
    let mut parts = line.split_whitespace();
    let kind = parts.next()?.to_string();
    let mut psi = PsiLine::default();
    for field in parts {
        let (k, v) = field.split_once('=')?;
        match k {
            "avg10" => psi.avg10 = v.parse().unwrap_or(0.0),
            "avg60" => psi.avg60 = v.parse().unwrap_or(0.0),
            "avg300" => psi.avg300 = v.parse().unwrap_or(0.0),
            "total" => psi.total_usec = v.parse().unwrap_or(0),
            _ => {}
        }
    }
    Some((kind, psi))
}

pub fn parse_pressure(input: &str) -> Result<PsiMetric, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut metric = PsiMetric::default();
    for line in input.lines() {
        if let Some((kind, psi)) = parse_psi_line(line) {
            match kind.as_str() {
                "some" => metric.some = psi,
                "full" => metric.full = Some(psi),
                _ => {}
            }
        }
    }
    Ok(metric)
}

pub fn parse_pid_cgroup(input: &str) -> Result<String, ParseError> {
    // cgroup v2: a single "0::/path" line.
    for line in input.lines() {
        if let Some((_, path)) = line.split_once("::") {
            return Ok(path.trim().to_string());
        }
    }
    Err(ParseError::UnexpectedFormat(input.to_string()))
}

pub fn cpu_count_from_cpuinfo(input: &str) -> usize {
    input.lines().filter(|l| l.starts_with("processor")).count()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub ms_reading: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub ms_writing: u64,
    pub ios_in_progress: u64,
    pub ms_doing_io: u64,
    pub weighted_ms_doing_io: u64,
}

pub fn parse_diskstats(input: &str) -> Result<HashMap<String, DiskStats>, ParseError> {
    let mut map = HashMap::new();
    for line in input.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            continue;
        }
        let name = fields[2].to_string();
        let n = |i: usize| fields.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
        map.insert(
            name,
            DiskStats {
                reads_completed: n(3),
                reads_merged: n(4),
                sectors_read: n(5),
                ms_reading: n(6),
                writes_completed: n(7),
                writes_merged: n(8),
                sectors_written: n(9),
                ms_writing: n(10),
                ios_in_progress: n(11),
                ms_doing_io: n(12),
                weighted_ms_doing_io: n(13),
            },
        );
    }
    if map.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_FIXTURE: &str = "cpu  1000 20 300 8000 50 0 10 0 0 0\ncpu0 500 10 150 4000 25 0 5 0 0 0\nctxt 123456\nprocesses 789\nprocs_running 2\nprocs_blocked 0\n";

    #[test]
    fn parses_aggregate_and_per_cpu_lines() {
        let stat = parse_proc_stat(STAT_FIXTURE).unwrap();
        assert_eq!(stat.aggregate.user, 1000);
        assert_eq!(stat.per_cpu.len(), 1);
        assert_eq!(stat.ctxt, 123456);
    }

    #[test]
    fn utilization_pct_matches_s2_scenario_shape() {
        let before = CpuTimes { user: 0, nice: 0, system: 0, idle: 0, iowait: 0, irq: 0, softirq: 0, steal: 0 };
        let after = CpuTimes { user: 785, nice: 0, system: 133, idle: 82, iowait: 0, irq: 0, softirq: 0, steal: 0 };
        let pct = before.utilization_pct_since(&after);
        assert!((pct.user - 78.5).abs() < 0.1);
        assert!((pct.system - 13.3).abs() < 0.1);
    }

    #[test]
    fn parses_loadavg() {
        let la = parse_loadavg("1.25 0.98 0.50 3/512 98765\n").unwrap();
        assert_eq!(la.load1, 1.25);
        assert_eq!(la.runnable, 3);
        assert_eq!(la.total_threads, 512);
    }

    #[test]
    fn meminfo_available_pct() {
        let mut map = HashMap::new();
        map.insert("MemTotal".to_string(), 1_000_000);
        map.insert("MemAvailable".to_string(), 600_000);
        assert_eq!(mem_available_pct(&map), 60.0);
    }

    #[test]
    fn parses_net_dev_skipping_header() {
        let input = "Inter-|   Receive\n face |bytes packets errs drop fifo frame compressed multicast|bytes packets errs drop fifo colls carrier compressed\n  eth0: 100 10 0 0 0 0 0 0 200 20 0 0 0 0 0 0\n";
        let map = parse_net_dev(input).unwrap();
        let eth0 = &map["eth0"];
        assert_eq!(eth0.rx_bytes, 100);
        assert_eq!(eth0.tx_packets, 20);
    }

    #[test]
    fn parses_pressure_some_and_full() {
        let input = "some avg10=2.50 avg60=1.00 avg300=0.50 total=123456\nfull avg10=0.10 avg60=0.05 avg300=0.00 total=789\n";
        let psi = parse_pressure(input).unwrap();
        assert_eq!(psi.some.avg10, 2.50);
        assert_eq!(psi.full.unwrap().avg10, 0.10);
    }

    #[test]
    fn parses_cgroup_v2_single_line() {
        let path = parse_pid_cgroup("0::/user.slice/user-1000.slice\n").unwrap();
        assert_eq!(path, "/user.slice/user-1000.slice");
    }
}
