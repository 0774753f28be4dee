use serde::{Deserialize, Serialize};

/// Closed error-code taxonomy. Every tool failure surfaces one of
/// these; no handler is allowed to invent a new code at the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidParams,
    InvalidDuration,
    InvalidPid,
    InvalidPath,
    ToolNotFound,
    PermissionDenied,
    CapabilityMissing,
    FeatureUnavailable,
    Timeout,
    ExecutionFailed,
    ParseError,
    OutputTruncated,
    ProfilerBusy,
    CgroupNotFound,
    DeviceNotFound,
    PidNotFound,
    FileNotFound,
}

impl ErrorCode {
    /// Fixed human-readable remediation hint for this code.
    pub const fn suggestion(self) -> &'static str {
        use ErrorCode::*;
        match self {
            InvalidParams => "check the tool's input schema and resubmit with valid fields",
            InvalidDuration => "use a duration between the tool's minimum and maximum seconds",
            InvalidPid => "pass a positive integer PID that refers to a live process",
            InvalidPath => "the requested path is outside the host's readable-path policy",
            ToolNotFound => "install the missing executable or choose a tool that does not need it",
            PermissionDenied => "retry as root, or lower perf_event_paranoid, or request a shorter duration",
            CapabilityMissing => "this host lacks the capability this tool needs; check perf_capabilities",
            FeatureUnavailable => "this kernel/host does not expose the feature this tool relies on",
            Timeout => "retry with a shorter duration or fewer samples",
            ExecutionFailed => "the underlying tool exited with an error; check stderr in the response",
            ParseError => "the underlying tool's output did not match any known format",
            OutputTruncated => "narrow the request scope to stay under the output size limit",
            ProfilerBusy => "another profiler-class tool is running; retry shortly",
            CgroupNotFound => "the requested cgroup does not exist or cgroup v2 is not mounted",
            DeviceNotFound => "the requested block/network device does not exist on this host",
            PidNotFound => "no process with that PID is currently running",
            FileNotFound => "the requested file does not exist or is not readable",
        }
    }

    /// Whether a retry (possibly with different parameters/privileges) could succeed.
    pub const fn recoverable(self) -> bool {
        use ErrorCode::*;
        matches!(self, PermissionDenied | Timeout | ProfilerBusy | CapabilityMissing)
    }
}

/// A tool-facing error: the code plus a free-text message and optional
/// suggestion override. Mirrors the envelope's `error` field exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
    pub suggestion: Option<String>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable: code.recoverable(),
            suggestion: Some(code.suggestion().to_string()),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}
