//! Parsers for `ss -s` (socket summary) and `ss -tnap` (per-connection list).

use super::ParseError;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketSummary {
    pub total: u64,
    pub tcp_estab: u64,
    pub tcp_closed: u64,
    pub tcp_orphaned: u64,
    pub tcp_timewait: u64,
    pub udp: u64,
}

/// `ss -s` output:
/// ```text
/// Total: 312
/// TCP:   48 (estab 12, closed 30, orphaned 0, timewait 28)
/// ...
/// UDP         5             -         -
/// ```
pub fn parse_ss_summary(input: &str) -> Result<SocketSummary, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut out = SocketSummary::default();
    for line in input.lines() {
        if let Some(rest) = line.strip_prefix("Total:") {
            out.total = rest.trim().split_whitespace().next().and_then(|v| v.parse().ok()).unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("TCP:") {
            let count = rest.trim().split_whitespace().next().and_then(|v| v.parse().ok()).unwrap_or(0);
            out.tcp_closed = count; // overwritten below with the precise field if present
            for field in ["estab", "closed", "orphaned", "timewait"] {
                if let Some(pos) = rest.find(field) {
                    let after = &rest[pos + field.len()..];
                    let value = after
                        .trim_start_matches(|c: char| !c.is_ascii_digit())
                        .split(|c: char| !c.is_ascii_digit())
                        .next()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    match field {
                        "estab" => out.tcp_estab = value,
                        "closed" => out.tcp_closed = value,
                        "orphaned" => out.tcp_orphaned = value,
                        "timewait" => out.tcp_timewait = value,
                        _ => {}
                    }
                }
            }
        } else if line.trim_start().starts_with("UDP") {
            out.udp = line.split_whitespace().nth(1).and_then(|v| v.parse().ok()).unwrap_or(0);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection {
    pub state: String,
    pub local: String,
    pub peer: String,
    pub pid: Option<u32>,
}

/// `ss -tnap` rows:
/// `ESTAB 0 0 10.0.0.5:443 10.0.0.9:51422 users:(("nginx",pid=123,fd=9))`
pub fn parse_ss_connections(input: &str) -> Result<Vec<Connection>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("State") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            continue;
        }
        let pid = line
            .split("pid=")
            .nth(1)
            .and_then(|rest| rest.split(|c: char| !c.is_ascii_digit()).next())
            .and_then(|v| v.parse().ok());
        out.push(Connection {
            state: fields[0].to_string(),
            local: fields[3].to_string(),
            peer: fields[4].to_string(),
            pid,
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no connection rows parsed".into()));
    }
    Ok(out)
}

/// Counts connections by state, used by several tool handlers.
pub fn connections_by_state(conns: &[Connection]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for c in conns {
        *map.entry(c.state.clone()).or_insert(0) += 1;
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_summary_counts() {
        let input = "Total: 312\nTCP:   48 (estab 12, closed 30, orphaned 0, timewait 28)\nUDP         5             -         -\n";
        let summary = parse_ss_summary(input).unwrap();
        assert_eq!(summary.total, 312);
        assert_eq!(summary.tcp_estab, 12);
        assert_eq!(summary.tcp_timewait, 28);
        assert_eq!(summary.udp, 5);
    }

    #[test]
    fn parses_connection_rows_with_pid() {
        let input = "State  Recv-Q Send-Q  Local Address:Port   Peer Address:Port  Process\nESTAB  0      0       10.0.0.5:443         10.0.0.9:51422      users:((\"nginx\",pid=123,fd=9))\n";
        let conns = parse_ss_connections(input).unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].state, "ESTAB");
        assert_eq!(conns[0].pid, Some(123));
    }
}
