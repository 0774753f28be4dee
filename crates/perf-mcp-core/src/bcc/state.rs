//! Per-tool BCC compile-state hint, persisted under a scoped tmp directory.
//! Used only as a heuristic for the dynamic timeout; schema is stable and
//! unknown fields are ignored on read.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BccToolHint {
    pub last_compile_time: chrono::DateTime<chrono::Utc>,
    pub compile_succeeded: bool,
    pub compile_duration_ms: u64,
    #[serde(default)]
    pub last_error: Option<String>,
}

pub struct BccStateCache {
    base_dir: PathBuf,
    hints: Mutex<HashMap<String, BccToolHint>>,
}

impl BccStateCache {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir, hints: Mutex::new(HashMap::new()) }
    }

    fn hint_path(&self, tool: &str) -> PathBuf {
        self.base_dir.join("bcc-cache").join(format!("{tool}.json"))
    }

    /// Reads the cached hint, checking the in-memory map first and falling
    /// back to disk (best-effort; a missing/corrupt file is not an error).
    pub async fn get(&self, tool: &str) -> Option<BccToolHint> {
        if let Some(hint) = self.hints.lock().await.get(tool).cloned() {
            return Some(hint);
        }
        let raw = tokio::fs::read_to_string(self.hint_path(tool)).await.ok()?;
        let hint: BccToolHint = serde_json::from_str(&raw).ok()?;
        self.hints.lock().await.insert(tool.to_string(), hint.clone());
        Some(hint)
    }

    /// Updates the hint after every attempt. Writes never block
    /// the hot path: disk persistence is best-effort and failures are
    /// swallowed.
    pub async fn update(&self, tool: &str, hint: BccToolHint) {
        self.hints.lock().await.insert(tool.to_string(), hint.clone());

        let path = self.hint_path(tool);
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Ok(body) = serde_json::to_string_pretty(&hint) {
            let _ = tokio::fs::write(&path, body).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BccStateCache::new(dir.path().to_path_buf());
        assert!(cache.get("biolatency").await.is_none());

        let hint = BccToolHint {
            last_compile_time: chrono::Utc::now(),
            compile_succeeded: true,
            compile_duration_ms: 8200,
            last_error: None,
        };
        cache.update("biolatency", hint.clone()).await;

        let fetched = cache.get("biolatency").await.unwrap();
        assert!(fetched.compile_succeeded);
        assert_eq!(fetched.compile_duration_ms, 8200);
    }
}
