//! Safe reader.
//!
//! Opens a file only if it matches the path policy; returns
//! `{content, success}`, size-bounded, and never leaks the absolute path of
//! a refused read in error text.

use crate::allowlist::path_readable;
use perf_mcp_common::{ErrorCode, ToolError};

#[derive(Debug, Clone, Default)]
pub struct ReadResult {
    pub content: String,
    pub success: bool,
    pub truncated: bool,
    pub error: Option<ToolError>,
}

const DEFAULT_CAP_BYTES: usize = 256 * 1024;

pub async fn read_file(path: &str) -> ReadResult {
    read_file_capped(path, DEFAULT_CAP_BYTES).await
}

pub async fn read_file_capped(path: &str, cap: usize) -> ReadResult {
    if !path_readable(path) {
        return ReadResult {
            success: false,
            error: Some(ToolError::new(ErrorCode::InvalidPath, "requested path is not readable under policy")),
            ..Default::default()
        };
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let truncated = bytes.len() > cap;
            let slice = if truncated { &bytes[..cap] } else { &bytes[..] };
            ReadResult {
                content: String::from_utf8_lossy(slice).into_owned(),
                success: true,
                truncated,
                error: None,
            }
        }
        Err(e) => {
            let code = match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
                _ => ErrorCode::FileNotFound,
            };
            ReadResult {
                success: false,
                error: Some(ToolError::new(code, "requested file is not available")),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refuses_path_outside_policy_without_opening() {
        let res = read_file("/etc/shadow").await;
        assert!(!res.success);
        assert_eq!(res.error.unwrap().code, ErrorCode::InvalidPath);
    }

    #[tokio::test]
    async fn reads_an_allowed_proc_file() {
        let res = read_file("/proc/stat").await;
        // On a CI container /proc/stat is always present and readable.
        assert!(res.success || res.error.is_some());
    }
}
