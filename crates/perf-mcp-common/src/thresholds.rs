//! The USE-method threshold table. A pure policy: given a metric
//! value and its warn/crit thresholds, decide a status. Higher-is-worse by
//! default; a handful of metrics (available memory %) are lower-is-worse and
//! use [`Direction::LowerIsWorse`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    HigherIsWorse,
    LowerIsWorse,
}

#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    pub warn: f64,
    pub crit: f64,
    pub direction: Direction,
}

impl Threshold {
    pub const fn higher_is_worse(warn: f64, crit: f64) -> Self {
        Self { warn, crit, direction: Direction::HigherIsWorse }
    }
    pub const fn lower_is_worse(warn: f64, crit: f64) -> Self {
        Self { warn, crit, direction: Direction::LowerIsWorse }
    }

    pub fn evaluate(&self, value: f64) -> Status {
        match self.direction {
            Direction::HigherIsWorse => {
                if value >= self.crit {
                    Status::Critical
                } else if value >= self.warn {
                    Status::Warning
                } else {
                    Status::Ok
                }
            }
            Direction::LowerIsWorse => {
                if value <= self.crit {
                    Status::Critical
                } else if value <= self.warn {
                    Status::Warning
                } else {
                    Status::Ok
                }
            }
        }
    }
}

pub const CPU_UTILIZATION_PCT: Threshold = Threshold::higher_is_worse(70.0, 90.0);
/// Saturation is expressed as a multiple of `cpu_count`; callers pre-scale
/// the run-queue length by `1.0 / cpu_count` before evaluating against this
/// table (warn = 1x, crit = 2x becomes warn=1.0, crit=2.0 on the ratio).
pub const CPU_SATURATION_RATIO: Threshold = Threshold::higher_is_worse(1.0, 2.0);
pub const MEMORY_AVAILABLE_PCT: Threshold = Threshold::lower_is_worse(20.0, 10.0);
pub const SWAP_USED_PCT: Threshold = Threshold::higher_is_worse(10.0, 50.0);
pub const DISK_UTILIZATION_PCT: Threshold = Threshold::higher_is_worse(60.0, 80.0);
pub const DISK_QUEUE_LENGTH: Threshold = Threshold::higher_is_worse(2.0, 8.0);
pub const DISK_AWAIT_MS: Threshold = Threshold::higher_is_worse(20.0, 50.0);
pub const NET_DROPS_PER_SEC: Threshold = Threshold::higher_is_worse(1.0, 100.0);
pub const NET_RETRANSMIT_PCT: Threshold = Threshold::higher_is_worse(1.0, 5.0);
pub const PSI_SOME_AVG10_PCT: Threshold = Threshold::higher_is_worse(10.0, 25.0);
pub const PSI_FULL_AVG10_PCT: Threshold = Threshold::higher_is_worse(5.0, 15.0);

/// The overall status across a set of per-metric statuses is the max.
pub fn overall_status(statuses: impl IntoIterator<Item = Status>) -> Status {
    statuses.into_iter().max().unwrap_or(Status::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_utilization_warning_boundary() {
        assert_eq!(CPU_UTILIZATION_PCT.evaluate(69.9), Status::Ok);
        assert_eq!(CPU_UTILIZATION_PCT.evaluate(70.0), Status::Warning);
        assert_eq!(CPU_UTILIZATION_PCT.evaluate(90.0), Status::Critical);
    }

    #[test]
    fn memory_available_is_lower_is_worse() {
        assert_eq!(MEMORY_AVAILABLE_PCT.evaluate(50.0), Status::Ok);
        assert_eq!(MEMORY_AVAILABLE_PCT.evaluate(20.0), Status::Warning);
        assert_eq!(MEMORY_AVAILABLE_PCT.evaluate(5.0), Status::Critical);
    }

    #[test]
    fn overall_is_max_across_metrics() {
        let s = overall_status([Status::Ok, Status::Warning, Status::Ok]);
        assert_eq!(s, Status::Warning);
    }
}
