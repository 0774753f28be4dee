//! Parsers for cgroup v2 controller files: `cpu.stat`, `cpu.max`,
//! `memory.*`, `io.stat`, `pids.*`.

use super::ParseError;
use std::collections::HashMap;

/// `cpu.stat`: a flat `key value` table.
pub fn parse_cpu_stat(input: &str) -> Result<HashMap<String, u64>, ParseError> {
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuMax {
    /// `None` means "max" (unlimited).
    pub quota_usec: Option<u64>,
    pub period_usec: u64,
}

/// `cpu.max`: a single line `"<quota|max> <period>"`.
pub fn parse_cpu_max(input: &str) -> Result<CpuMax, ParseError> {
    let mut fields = input.split_whitespace();
    let quota = fields.next().ok_or(ParseError::Empty)?;
    let period = fields.next().and_then(|p| p.parse().ok()).unwrap_or(100_000);
    let quota_usec = if quota == "max" { None } else { quota.parse().ok() };
    Ok(CpuMax { quota_usec, period_usec: period })
}

/// Any `memory.*`/`pids.*` single-value file (`memory.current`,
/// `memory.max`, `pids.current`, `pids.max`, ...). `"max"` parses to `None`.
pub fn parse_single_value(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed == "max" {
        None
    } else {
        trimmed.parse().ok()
    }
}

/// `memory.stat`: a flat `key value` table, same shape as `cpu.stat`.
pub fn parse_memory_stat(input: &str) -> Result<HashMap<String, u64>, ParseError> {
    parse_cpu_stat(input)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoStatLine {
    pub device: String,
    pub rbytes: u64,
    pub wbytes: u64,
    pub rios: u64,
    pub wios: u64,
}

/// `io.stat`: one line per device-major:minor, e.g.
/// `8:0 rbytes=1048576 wbytes=2097152 rios=12 wios=34 dbytes=0 dios=0`.
pub fn parse_io_stat(input: &str) -> Result<Vec<IoStatLine>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let mut fields = line.split_whitespace();
        let Some(device) = fields.next() else { continue };
        let mut line_stat = IoStatLine { device: device.to_string(), ..Default::default() };
        for field in fields {
            let Some((k, v)) = field.split_once('=') else { continue };
            let v: u64 = v.parse().unwrap_or(0);
            match k {
                "rbytes" => line_stat.rbytes = v,
                "wbytes" => line_stat.wbytes = v,
                "rios" => line_stat.rios = v,
                "wios" => line_stat.wios = v,
                _ => {}
            }
        }
        out.push(line_stat);
    }
    if out.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpu_max_with_quota() {
        let cm = parse_cpu_max("100000 100000\n").unwrap();
        assert_eq!(cm.quota_usec, Some(100000));
    }

    #[test]
    fn parses_cpu_max_unlimited() {
        let cm = parse_cpu_max("max 100000\n").unwrap();
        assert_eq!(cm.quota_usec, None);
    }

    #[test]
    fn parses_single_value_max_as_none() {
        assert_eq!(parse_single_value("max\n"), None);
        assert_eq!(parse_single_value("1048576\n"), Some(1048576));
    }

    #[test]
    fn parses_io_stat_lines() {
        let stats = parse_io_stat("8:0 rbytes=1048576 wbytes=2097152 rios=12 wios=34 dbytes=0 dios=0\n").unwrap();
        assert_eq!(stats[0].device, "8:0");
        assert_eq!(stats[0].rbytes, 1048576);
    }
}
