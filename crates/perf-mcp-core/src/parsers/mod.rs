//! Parsers.
//!
//! Every parser here is a pure, deterministic, side-effect-free function
//! from a raw string to a typed record. None perform I/O.

pub mod bcc;
pub mod bpftrace;
pub mod cgroup;
pub mod iostat;
pub mod perf;
pub mod procfs;
pub mod ss;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("no recognizable fields in line: {0}")]
    NoFields(String),
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),
}

/// Percentiles over a sorted sample set, computed once at the edge.
/// `samples` must already be sorted ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

pub fn percentiles(sorted_samples: &[f64]) -> Percentiles {
    if sorted_samples.is_empty() {
        return Percentiles::default();
    }
    let at = |p: f64| -> f64 {
        let idx = ((sorted_samples.len() as f64 - 1.0) * p).round() as usize;
        sorted_samples[idx.min(sorted_samples.len() - 1)]
    };
    Percentiles { p50: at(0.50), p95: at(0.95), p99: at(0.99) }
}

/// Converts a latency value expressed in `unit` into microseconds, the one
/// canonical unit exposed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
}

pub fn to_microseconds(value: f64, unit: LatencyUnit) -> f64 {
    match unit {
        LatencyUnit::Nanoseconds => value / 1000.0,
        LatencyUnit::Microseconds => value,
        LatencyUnit::Milliseconds => value * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_ten_samples() {
        let samples: Vec<f64> = (1..=10).map(|n| n as f64).collect();
        let p = percentiles(&samples);
        assert_eq!(p.p50, 6.0);
        assert_eq!(p.p99, 10.0);
    }

    #[test]
    fn unit_conversion_is_consistent() {
        assert_eq!(to_microseconds(1000.0, LatencyUnit::Nanoseconds), 1.0);
        assert_eq!(to_microseconds(1.0, LatencyUnit::Milliseconds), 1000.0);
    }

    #[test]
    fn percentiles_are_monotonic_across_varied_sample_sets() {
        let sets: &[&[f64]] = &[
            &[1.0],
            &[1.0, 1.0, 1.0],
            &[1.0, 2.0],
            &[0.1, 0.2, 0.2, 0.3, 50.0, 50.0, 50.0, 999.0],
            &(1..=1000).map(|n| n as f64).collect::<Vec<_>>(),
        ];
        for samples in sets {
            let p = percentiles(samples);
            assert!(p.p50 <= p.p95, "p50 {} > p95 {} for {:?}", p.p50, p.p95, samples);
            assert!(p.p95 <= p.p99, "p95 {} > p99 {} for {:?}", p.p95, p.p99, samples);
        }
    }
}
