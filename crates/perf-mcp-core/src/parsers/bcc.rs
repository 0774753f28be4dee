//! Parsers for BCC textual outputs: `biolatency`/`runqlat` log2 histograms,
//! `tcplife`, `tcpconnect`, `execsnoop`, `syscount` (with and without
//! latency), `gethostlatency`, `filelife`, `fileslower`, `opensnoop`,
//! `vfsstat`, `offcputime` folded stacks.

use super::ParseError;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u64,
}

/// A log2 histogram line from `biolatency`/`runqlat`:
/// `     0 -> 1          : 3        |****                                    |`
pub fn parse_log2_histogram(input: &str) -> Result<Vec<HistogramBucket>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let Some((range_part, rest)) = line.split_once(':') else { continue };
        if !range_part.contains("->") {
            continue;
        }
        let mut bounds = range_part.split("->").map(|b| b.trim());
        let (Some(start_s), Some(end_s)) = (bounds.next(), bounds.next()) else { continue };
        let (Ok(start), Ok(end)) = (start_s.parse::<f64>(), end_s.parse::<f64>()) else { continue };
        let count = rest.split('|').next().unwrap_or("0").trim().parse().unwrap_or(0);
        out.push(HistogramBucket { range_start: start, range_end: end, count });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no histogram rows parsed".into()));
    }
    Ok(out)
}

/// Renders each bucket's `bar` field as a string of `*` proportional to
/// count / max(count), capped at 40 characters.
pub fn render_bars(buckets: &[HistogramBucket]) -> Vec<String> {
    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    buckets
        .iter()
        .map(|b| {
            let len = ((b.count as f64 / max_count as f64) * 40.0).round() as usize;
            "*".repeat(len.min(40))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TcpLifeEvent {
    pub pid: u32,
    pub comm: String,
    pub laddr: String,
    pub lport: u16,
    pub raddr: String,
    pub rport: u16,
    pub tx_kb: f64,
    pub rx_kb: f64,
    pub ms: f64,
}

/// `tcplife` rows: `PID COMM LADDR LPORT RADDR RPORT TX_KB RX_KB MS`.
pub fn parse_tcplife(input: &str) -> Result<Vec<TcpLifeEvent>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("PID") {
            continue;
        }
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 9 {
            continue;
        }
        let Ok(pid) = f[0].parse() else { continue };
        out.push(TcpLifeEvent {
            pid,
            comm: f[1].to_string(),
            laddr: f[2].to_string(),
            lport: f[3].parse().unwrap_or(0),
            raddr: f[4].to_string(),
            rport: f[5].parse().unwrap_or(0),
            tx_kb: f[6].parse().unwrap_or(0.0),
            rx_kb: f[7].parse().unwrap_or(0.0),
            ms: f[8].parse().unwrap_or(0.0),
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no tcplife rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TcpConnectEvent {
    pub pid: u32,
    pub comm: String,
    pub raddr: String,
    pub rport: u16,
}

/// `tcpconnect` rows: `PID COMM ... RADDR RPORT`.
pub fn parse_tcpconnect(input: &str) -> Result<Vec<TcpConnectEvent>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("PID") {
            continue;
        }
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 4 {
            continue;
        }
        let Ok(pid) = f[0].parse() else { continue };
        let rport = f.last().and_then(|s| s.parse().ok()).unwrap_or(0);
        let raddr = f[f.len() - 2].to_string();
        out.push(TcpConnectEvent { pid, comm: f[1].to_string(), raddr, rport });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no tcpconnect rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecEvent {
    pub pid: u32,
    pub ppid: u32,
    pub comm: String,
    pub args: String,
}

/// `execsnoop` rows: `PCOMM PID PPID RET ARGS`.
pub fn parse_execsnoop(input: &str) -> Result<Vec<ExecEvent>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("PCOMM") {
            continue;
        }
        let f: Vec<&str> = line.splitn(5, char::is_whitespace).filter(|s| !s.is_empty()).collect();
        if f.len() < 4 {
            continue;
        }
        let (Ok(pid), Ok(ppid)) = (f[1].parse(), f[2].parse()) else { continue };
        out.push(ExecEvent {
            pid,
            ppid,
            comm: f[0].to_string(),
            args: f.get(4).unwrap_or(&"").to_string(),
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no execsnoop rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyscountEntry {
    pub name: String,
    pub count: u64,
    pub latency_ms: Option<f64>,
}

/// `syscount` output, with (`-L`) or without per-syscall latency:
/// ```text
/// SYSCALL                 COUNT
/// futex                    9213
/// ```
/// or
/// ```text
/// SYSCALL                 COUNT     TIME (us)
/// futex                    9213        184210
/// ```
pub fn parse_syscount(input: &str) -> Result<Vec<SyscountEntry>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("SYSCALL") {
            continue;
        }
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 2 {
            continue;
        }
        let Ok(count) = f[1].parse::<u64>() else { continue };
        let latency_ms = f.get(2).and_then(|s| s.parse::<f64>().ok()).map(|us| us / 1000.0);
        out.push(SyscountEntry { name: f[0].to_string(), count, latency_ms });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no syscount rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimpleLatencyEvent {
    pub pid: u32,
    pub comm: String,
    pub detail: String,
    pub ms: f64,
}

/// Shared shape for `gethostlatency`, `filelife`, `fileslower`,
/// `opensnoop`: `TIME PID COMM ... LAT(ms)` (last column is latency in ms).
pub fn parse_simple_latency_rows(input: &str) -> Result<Vec<SimpleLatencyEvent>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let first = line.split_whitespace().next().unwrap_or("");
        if first.chars().any(|c| c.is_ascii_alphabetic()) && !first.chars().next().unwrap_or(' ').is_ascii_digit() {
            continue; // header row
        }
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 3 {
            continue;
        }
        let Some(ms) = f.last().and_then(|s| s.parse::<f64>().ok()) else { continue };
        let Ok(pid) = f[0].parse() else { continue };
        out.push(SimpleLatencyEvent {
            pid,
            comm: f.get(1).unwrap_or(&"").to_string(),
            detail: f[2..f.len().saturating_sub(1)].join(" "),
            ms,
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no latency rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VfsStatSample {
    pub reads: u64,
    pub writes: u64,
    pub creates: u64,
    pub opens: u64,
    pub fsyncs: u64,
}

/// `vfsstat` one-shot rows: `TIME READ/s WRITE/s CREATE/s OPEN/s FSYNC/s`.
pub fn parse_vfsstat(input: &str) -> Result<Vec<VfsStatSample>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("TIME") {
            continue;
        }
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 6 {
            continue;
        }
        let n = |i: usize| f.get(i).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0) as u64;
        out.push(VfsStatSample { reads: n(1), writes: n(2), creates: n(3), opens: n(4), fsyncs: n(5) });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no vfsstat rows parsed".into()));
    }
    Ok(out)
}

/// `offcputime -f` emits folded stacks identical in shape to `perf script`
/// folded output, so it reuses [`super::perf::parse_folded_stacks`].
pub use super::perf::parse_folded_stacks as parse_offcputime_folded;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log2_histogram_and_bars_are_bounded() {
        let input = "     usecs               : count     distribution\n         0 -> 1          : 0        |                                        |\n         2 -> 3          : 42       |****************************************|\n         4 -> 7          : 10       |*********                               |\n";
        let buckets = parse_log2_histogram(input).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].count, 42);
        let bars = render_bars(&buckets);
        assert!(bars.iter().all(|b| b.len() <= 40));
        assert_eq!(bars[1].len(), 40);
    }

    #[test]
    fn parses_syscount_with_latency() {
        let input = "SYSCALL                 COUNT     TIME (us)\nfutex                    9213        184210\n";
        let rows = parse_syscount(input).unwrap();
        assert_eq!(rows[0].name, "futex");
        assert_eq!(rows[0].count, 9213);
        assert!((rows[0].latency_ms.unwrap() - 184.21).abs() < 0.01);
    }

    #[test]
    fn parses_tcplife_rows() {
        let input = "PID    COMM       LADDR           LPORT RADDR           RPORT TX_KB RX_KB MS\n1234   curl       10.0.0.5        51422 93.184.216.34   443   1     4     120.5\n";
        let events = parse_tcplife(input).unwrap();
        assert_eq!(events[0].pid, 1234);
        assert_eq!(events[0].rport, 443);
    }
}
