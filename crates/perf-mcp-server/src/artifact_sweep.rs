//! Background artifact sweep: removes files under the artifact directory
//! older than the configured TTL. Spawned once at server start, never on
//! the hot path of a tool invocation.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

pub fn spawn(artifact_dir: PathBuf, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300).min(ttl.max(Duration::from_secs(1))));
        loop {
            interval.tick().await;
            sweep_once(&artifact_dir, ttl).await;
        }
    });
}

async fn sweep_once(dir: &PathBuf, ttl: Duration) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return, // directory doesn't exist yet; nothing to sweep
    };
    let now = SystemTime::now();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else { continue };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else { continue };
        let Ok(age) = now.duration_since(modified) else { continue };
        if age > ttl {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to sweep expired artifact");
            } else {
                tracing::debug!(path = %entry.path().display(), "swept expired artifact");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sweep_removes_files_older_than_ttl_and_keeps_fresh_ones() {
        let dir = tempfile::tempdir().unwrap();
        let old_path = dir.path().join("old.data");
        let fresh_path = dir.path().join("fresh.data");
        tokio::fs::write(&old_path, b"stale").await.unwrap();
        tokio::fs::write(&fresh_path, b"new").await.unwrap();

        // Backdate the "old" file's mtime well past a short TTL.
        let old_time = SystemTime::now() - Duration::from_secs(1000);
        filetime_backdate(&old_path, old_time);

        sweep_once(&dir.path().to_path_buf(), Duration::from_secs(1)).await;

        assert!(!old_path.exists());
        assert!(fresh_path.exists());
    }

    /// Backdates a file's mtime via `nix`'s safe `utimensat` wrapper
    /// (workspace lints deny `unsafe_code`, so a raw libc call is off the
    /// table even in tests).
    fn filetime_backdate(path: &std::path::Path, when: SystemTime) {
        let duration = when.duration_since(SystemTime::UNIX_EPOCH).unwrap();
        let spec = nix::sys::time::TimeSpec::new(duration.as_secs() as i64, 0);
        nix::sys::stat::utimensat(None, path, &spec, &spec, nix::sys::stat::UtimensatFlags::FOLLOW_SYMLINK).unwrap();
    }
}
