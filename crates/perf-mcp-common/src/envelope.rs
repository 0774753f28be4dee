use crate::error::ToolError;
use serde::{Deserialize, Serialize};

/// The uniform response shape every tool produces.
///
/// Invariant: `data.is_some() == error.is_none()` always.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub tool: String,
    pub tool_version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// Carries the bits that are stable across one request's lifetime so every
/// handler doesn't have to rethread them: tool name/version, host, start
/// time. Built once per request by the caller.
pub struct EnvelopeContext {
    pub tool: String,
    pub tool_version: String,
    pub host: String,
    started_at: std::time::Instant,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl EnvelopeContext {
    pub fn new(tool: impl Into<String>, tool_version: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_version: tool_version.into(),
            host: host.into(),
            started_at: std::time::Instant::now(),
            timestamp: chrono::Utc::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn ok<T>(&self, data: T) -> Envelope<T> {
        Envelope {
            success: true,
            tool: self.tool.clone(),
            tool_version: self.tool_version.clone(),
            timestamp: self.timestamp,
            duration_ms: self.elapsed_ms(),
            host: self.host.clone(),
            data: Some(data),
            error: None,
            truncated: false,
            warnings: Vec::new(),
        }
    }

    pub fn ok_truncated<T>(&self, data: T, warnings: Vec<String>) -> Envelope<T> {
        let mut env = self.ok(data);
        env.truncated = true;
        env.warnings = warnings;
        env
    }

    pub fn err<T>(&self, error: ToolError) -> Envelope<T> {
        Envelope {
            success: false,
            tool: self.tool.clone(),
            tool_version: self.tool_version.clone(),
            timestamp: self.timestamp,
            duration_ms: self.elapsed_ms(),
            host: self.host.clone(),
            data: None,
            error: Some(error),
            truncated: false,
            warnings: Vec::new(),
        }
    }
}

impl<T> Envelope<T> {
    /// Checks the data/error mutual-exclusivity invariant; used in tests
    /// and debug assertions.
    pub fn is_well_formed(&self) -> bool {
        self.data.is_some() != self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn ok_and_err_are_mutually_exclusive() {
        let ctx = EnvelopeContext::new("perf_snapshot", "0.1.0", "testhost");
        let ok: Envelope<u32> = ctx.ok(42);
        assert!(ok.is_well_formed());
        assert!(ok.success);

        let err: Envelope<u32> = ctx.err(ToolError::new(ErrorCode::Timeout, "boom"));
        assert!(err.is_well_formed());
        assert!(!err.success);
    }
}
