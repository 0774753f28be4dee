//! Parser for `iostat -xz` extended device statistics.

use super::ParseError;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct DeviceStats {
    pub device: String,
    pub r_per_s: f64,
    pub w_per_s: f64,
    pub r_await_ms: f64,
    pub w_await_ms: f64,
    pub avg_queue_size: f64,
    pub util_pct: f64,
}

/// `iostat -xz` output: a "Device" header line followed by one row per
/// device; column order varies slightly across sysstat versions, so we
/// locate columns by header name rather than fixed index.
pub fn parse_iostat_xz(input: &str) -> Result<Vec<DeviceStats>, ParseError> {
    let mut lines = input.lines();
    let header_line = lines
        .by_ref()
        .find(|l| l.trim_start().starts_with("Device"))
        .ok_or_else(|| ParseError::UnexpectedFormat("no Device header found".into()))?;

    let headers: Vec<String> = header_line.split_whitespace().map(|h| h.to_lowercase()).collect();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let idx_device = col("device").ok_or_else(|| ParseError::UnexpectedFormat("no device column".into()))?;
    let idx_r = col("r/s");
    let idx_w = col("w/s");
    let idx_r_await = col("r_await");
    let idx_w_await = col("w_await");
    let idx_aqu_sz = col("aqu-sz").or_else(|| col("avgqu-sz"));
    let idx_util = col("%util");

    let mut devices = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= idx_device {
            continue;
        }
        let get = |idx: Option<usize>| idx.and_then(|i| fields.get(i)).and_then(|s| s.parse().ok()).unwrap_or(0.0);
        devices.push(DeviceStats {
            device: fields[idx_device].to_string(),
            r_per_s: get(idx_r),
            w_per_s: get(idx_w),
            r_await_ms: get(idx_r_await),
            w_await_ms: get(idx_w_await),
            avg_queue_size: get(idx_aqu_sz),
            util_pct: get(idx_util),
        });
    }
    if devices.is_empty() {
        return Err(ParseError::UnexpectedFormat("no device rows parsed".into()));
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "Linux 6.8.0 (host)  \t07/28/2026\t_x86_64_\t(8 CPU)\n\navg-cpu:  %user   %nice %system %iowait  %steal   %idle\n          12.50    0.00    3.20    1.10    0.00   83.20\n\nDevice            r/s     w/s   r_await   w_await  aqu-sz  %util\nnvme0n1          5.00   12.00      0.80      2.40    0.05   4.30\nsda              1.00    0.50     20.00     50.00    8.00  80.00\n";

    #[test]
    fn parses_device_rows_by_header_name() {
        let devices = parse_iostat_xz(FIXTURE).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device, "nvme0n1");
        assert_eq!(devices[1].util_pct, 80.0);
        assert_eq!(devices[1].w_await_ms, 50.0);
    }

    #[test]
    fn missing_header_is_a_parse_error() {
        assert!(parse_iostat_xz("nonsense\n").is_err());
    }
}
