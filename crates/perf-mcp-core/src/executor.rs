//! Safe executor.
//!
//! Spawns allow-listed programs directly (never through a shell), enforces
//! a deadline with SIGTERM-then-SIGKILL escalation, caps captured output,
//! and serializes profiler-class executions through a single mutex.

use crate::allowlist::{argv_permitted, lookup};
use perf_mcp_common::{ErrorCode, ToolError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub key: String,
    pub argv: Vec<String>,
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
    /// Declares this invocation needs exclusive access to system-wide
    /// tracing infrastructure.
    pub profiler_class: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub truncated: bool,
    pub error: Option<ToolError>,
}

/// Serializes "at most one profiler-class child at a time".
#[derive(Default)]
pub struct ProfilerGate {
    mutex: Mutex<()>,
}

pub struct Executor {
    profiler_gate: ProfilerGate,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self { profiler_gate: ProfilerGate::default() }
    }

    /// Reads at most `cap` bytes from `reader`, returning the bytes read
    /// and whether the stream had more data beyond the cap.
    async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> (Vec<u8>, bool) {
        let mut buf = Vec::with_capacity(cap.min(8192));
        let mut chunk = [0u8; 8192];
        let mut truncated = false;
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    if buf.len() + n > cap {
                        let remaining = cap.saturating_sub(buf.len());
                        buf.extend_from_slice(&chunk[..remaining]);
                        truncated = true;
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                Err(_) => break,
            }
        }
        (buf, truncated)
    }

    #[allow(unsafe_code)]
    pub async fn exec(&self, req: ExecRequest) -> ExecResult {
        let started = std::time::Instant::now();

        // Refused before any process is spawned.
        if lookup(&req.key).is_none() {
            return ExecResult {
                success: false,
                error: Some(ToolError::new(ErrorCode::ToolNotFound, format!("unknown allow-list key: {}", req.key))),
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            };
        }
        if !argv_permitted(&req.key, &req.argv) {
            return ExecResult {
                success: false,
                error: Some(ToolError::new(ErrorCode::InvalidParams, "argv contains an unpermitted flag or path")),
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            };
        }

        let _permit = if req.profiler_class {
            match tokio::time::timeout(Duration::from_millis(req.timeout_ms), self.profiler_gate.mutex.lock()).await {
                Ok(guard) => Some(guard),
                Err(_) => {
                    return ExecResult {
                        success: false,
                        error: Some(ToolError::new(ErrorCode::ProfilerBusy, "another profiler-class tool is running")),
                        duration_ms: started.elapsed().as_millis() as u64,
                        ..Default::default()
                    };
                }
            }
        } else {
            None
        };

        let entry = lookup(&req.key).expect("checked above");
        let mut cmd = Command::new(entry.absolute_path);
        cmd.args(&req.argv)
            .env_clear()
            .env("PATH", "/usr/bin:/usr/sbin:/bin:/sbin")
            .env("LANG", "C")
            .current_dir("/")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let code = match e.kind() {
                    std::io::ErrorKind::NotFound => ErrorCode::ToolNotFound,
                    std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
                    _ => ErrorCode::ExecutionFailed,
                };
                return ExecResult {
                    success: false,
                    error: Some(ToolError::new(code, format!("failed to spawn {}: {e}", entry.key))),
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..Default::default()
                };
            }
        };

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        let cap = req.max_output_bytes;

        let stdout_task = tokio::spawn(Self::read_capped(stdout, cap));
        let stderr_task = tokio::spawn(Self::read_capped(stderr, cap));

        let wait = tokio::time::timeout(Duration::from_millis(req.timeout_ms), child.wait()).await;

        match wait {
            Ok(Ok(status)) => {
                let (out_bytes, out_trunc) = stdout_task.await.unwrap_or_default();
                let (err_bytes, err_trunc) = stderr_task.await.unwrap_or_default();
                ExecResult {
                    success: status.success(),
                    stdout: String::from_utf8_lossy(&out_bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&err_bytes).into_owned(),
                    exit_code: status.code(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    truncated: out_trunc || err_trunc,
                    error: if status.success() {
                        None
                    } else {
                        Some(ToolError::new(ErrorCode::ExecutionFailed, format!("{} exited with {:?}", entry.key, status.code())))
                    },
                }
            }
            Ok(Err(e)) => ExecResult {
                success: false,
                error: Some(ToolError::new(ErrorCode::ExecutionFailed, format!("wait() failed: {e}"))),
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            },
            Err(_elapsed) => {
                Self::terminate_escalating(&mut child).await;
                let (out_bytes, _) = stdout_task.await.unwrap_or_default();
                let (err_bytes, _) = stderr_task.await.unwrap_or_default();
                ExecResult {
                    success: false,
                    stdout: String::from_utf8_lossy(&out_bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&err_bytes).into_owned(),
                    exit_code: None,
                    duration_ms: started.elapsed().as_millis() as u64,
                    truncated: true,
                    error: Some(ToolError::new(ErrorCode::Timeout, format!("{} did not complete within {}ms", entry.key, req.timeout_ms))),
                }
            }
        }
    }

    /// Cooperative SIGTERM, then a grace period, then SIGKILL.
    #[cfg(unix)]
    async fn terminate_escalating(child: &mut tokio::process::Child) {
        if let Some(pid) = child.id() {
            let pid = nix::unistd::Pid::from_raw(-(pid as i32));
            let _ = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM);
        }
        let grace = tokio::time::timeout(Duration::from_millis(500), child.wait()).await;
        if grace.is_err() {
            if let Some(pid) = child.id() {
                let pgid = nix::unistd::Pid::from_raw(-(pid as i32));
                let _ = nix::sys::signal::kill(pgid, nix::sys::signal::Signal::SIGKILL);
            }
            let _ = child.wait().await;
        }
    }

    #[cfg(not(unix))]
    async fn terminate_escalating(child: &mut tokio::process::Child) {
        let _ = child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_key_never_spawns() {
        let exec = Executor::new();
        let res = exec
            .exec(ExecRequest {
                key: "rm".to_string(),
                argv: vec!["-rf".to_string(), "/".to_string()],
                timeout_ms: 1000,
                max_output_bytes: 1024,
                profiler_class: false,
            })
            .await;
        assert!(!res.success);
        assert_eq!(res.error.unwrap().code, ErrorCode::ToolNotFound);
    }

    #[tokio::test]
    async fn unpermitted_argv_never_spawns() {
        let exec = Executor::new();
        let res = exec
            .exec(ExecRequest {
                key: "iostat".to_string(),
                argv: vec!["--definitely-not-a-flag".to_string()],
                timeout_ms: 1000,
                max_output_bytes: 1024,
                profiler_class: false,
            })
            .await;
        assert!(!res.success);
        assert_eq!(res.error.unwrap().code, ErrorCode::InvalidParams);
    }
}
