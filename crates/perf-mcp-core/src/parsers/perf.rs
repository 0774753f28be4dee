//! Parsers for `perf report --stdio`, `perf sched latency`,
//! `perf sched timehist`, and folded-stack format.

use super::ParseError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportEntry {
    pub overhead_pct: f64,
    pub command: String,
    pub symbol: String,
}

/// `perf report --stdio` lines look like:
/// `    45.23%  qemu-system-x8  [kernel.kallsyms]  [k] native_write_msr`
/// Comment lines start with `#`.
pub fn parse_report_stdio(input: &str) -> Result<Vec<ReportEntry>, ParseError> {
    let mut entries = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((pct_str, rest)) = line.split_once('%') else { continue };
        let Ok(pct) = pct_str.trim().parse::<f64>() else { continue };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let command = fields[0].to_string();
        let symbol = fields.last().map(|s| s.to_string()).unwrap_or_default();
        entries.push(ReportEntry { overhead_pct: pct, command, symbol });
    }
    if entries.is_empty() {
        return Err(ParseError::UnexpectedFormat("no report rows parsed".into()));
    }
    Ok(entries)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedLatencyEntry {
    pub task: String,
    pub pid: u32,
    pub avg_delay_ms: f64,
    pub max_delay_ms: f64,
    pub count: u64,
}

/// `perf sched latency` rows:
/// `  task:pid       |  runtime ms  |  switches | avg delay ms | max delay ms |`
pub fn parse_sched_latency(input: &str) -> Result<Vec<SchedLatencyEntry>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        if !line.contains('|') || line.trim_start().starts_with('-') {
            continue;
        }
        let cols: Vec<&str> = line.split('|').map(str::trim).collect();
        if cols.len() < 5 {
            continue;
        }
        let Some((task, pid_str)) = cols[0].rsplit_once(':') else { continue };
        let Ok(pid) = pid_str.trim().parse::<u32>() else { continue };
        let avg_delay = cols[3].split_whitespace().next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let max_delay = cols[4].split_whitespace().next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let switches = cols[2].split_whitespace().next().and_then(|s| s.parse().ok()).unwrap_or(0);
        out.push(SchedLatencyEntry {
            task: task.trim().to_string(),
            pid,
            avg_delay_ms: avg_delay,
            max_delay_ms: max_delay,
            count: switches,
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no sched latency rows parsed".into()));
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimehistEntry {
    pub comm: String,
    pub pid: u32,
    pub wait_time_ms: f64,
    pub sch_delay_ms: f64,
    pub run_time_ms: f64,
}

/// `perf sched timehist` rows:
/// `   123.456789 [0000]  myapp[1234]     0.000   0.020   1.500`
/// (time, cpu, comm[pid], wait, sch-delay, run-time — all in ms past the
/// first two columns). Header/separator lines are skipped.
pub fn parse_timehist(input: &str) -> Result<Vec<TimehistEntry>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("time") || line.starts_with('-') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }
        let Some(comm_pid) = fields.get(2) else { continue };
        let Some((comm, pid_str)) = comm_pid.rsplit_once('[') else { continue };
        let Ok(pid) = pid_str.trim_end_matches(']').parse::<u32>() else { continue };
        let n = |i: usize| fields.get(i).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
        out.push(TimehistEntry {
            comm: comm.to_string(),
            pid,
            wait_time_ms: n(3),
            sch_delay_ms: n(4),
            run_time_ms: n(5),
        });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no timehist rows parsed".into()));
    }
    Ok(out)
}

/// A folded-stack line: one collapsed call stack with a trailing count,
/// e.g. `main;foo;bar 42`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoldedStack {
    pub frames: Vec<String>,
    pub count: u64,
}

pub fn parse_folded_stacks(input: &str) -> Result<Vec<FoldedStack>, ParseError> {
    let mut out = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((stack, count_str)) = line.rsplit_once(' ') else { continue };
        let Ok(count) = count_str.parse::<u64>() else { continue };
        out.push(FoldedStack { frames: stack.split(';').map(str::to_string).collect(), count });
    }
    if out.is_empty() {
        return Err(ParseError::UnexpectedFormat("no folded stack lines parsed".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_stdio_rows() {
        let input = "# comment\n    45.23%  qemu-system-x8  [kernel.kallsyms]  [k] native_write_msr\n    12.00%  myapp           myapp                [.] compute\n";
        let entries = parse_report_stdio(input).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].overhead_pct, 45.23);
        assert_eq!(entries[0].symbol, "native_write_msr");
    }

    #[test]
    fn parses_sched_latency_rows() {
        let input = "  myapp:1234     |   1200.500 ms |     45 | avg:    2.500 ms | max:   18.200 ms |\n";
        let entries = parse_sched_latency(input).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pid, 1234);
        assert_eq!(entries[0].avg_delay_ms, 2.500);
    }

    #[test]
    fn parses_timehist_rows() {
        let input = "    time    cpu  task name          wait time  sch delay  run time\n-----------  ---  -----------------  ---------  ---------  --------\n  123.456789 [0000]  myapp[1234]     0.000   0.020   1.500\n";
        let rows = parse_timehist(input).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, 1234);
        assert_eq!(rows[0].run_time_ms, 1.500);
    }

    #[test]
    fn parses_folded_stack_lines() {
        let input = "main;foo;bar 42\nmain;baz 7\n";
        let stacks = parse_folded_stacks(input).unwrap();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].frames, vec!["main", "foo", "bar"]);
        assert_eq!(stacks[0].count, 42);
    }
}
