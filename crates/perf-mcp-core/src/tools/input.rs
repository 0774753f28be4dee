//! Shared input-validation helpers: duration 1-60s,
//! sample rate 1-999 Hz, positive integer PID.

use perf_mcp_common::{ErrorCode, ToolError};

pub const MIN_DURATION_SECONDS: u32 = 1;
pub const MAX_DURATION_SECONDS: u32 = 60;

/// `INVALID_DURATION` before any I/O.
pub fn validate_duration(seconds: u32) -> Result<u32, ToolError> {
    if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
        return Err(ToolError::new(
            ErrorCode::InvalidDuration,
            format!("duration_seconds must be between {MIN_DURATION_SECONDS} and {MAX_DURATION_SECONDS}, got {seconds}"),
        ));
    }
    Ok(seconds)
}

pub fn validate_pid(pid: i64) -> Result<u32, ToolError> {
    if pid <= 0 {
        return Err(ToolError::new(ErrorCode::InvalidPid, format!("pid must be a positive integer, got {pid}")));
    }
    Ok(pid as u32)
}

pub fn validate_sample_rate(hz: u32) -> Result<u32, ToolError> {
    if !(1..=999).contains(&hz) {
        return Err(ToolError::new(ErrorCode::InvalidParams, format!("sample_rate_hz must be between 1 and 999, got {hz}")));
    }
    Ok(hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_below_minimum_is_rejected() {
        assert_eq!(validate_duration(0).unwrap_err().code, ErrorCode::InvalidDuration);
    }

    #[test]
    fn duration_above_maximum_is_rejected() {
        assert_eq!(validate_duration(61).unwrap_err().code, ErrorCode::InvalidDuration);
    }

    #[test]
    fn duration_in_range_is_accepted() {
        assert_eq!(validate_duration(5), Ok(5));
    }

    #[test]
    fn non_positive_pid_is_rejected() {
        assert!(validate_pid(0).is_err());
        assert!(validate_pid(-1).is_err());
    }
}
