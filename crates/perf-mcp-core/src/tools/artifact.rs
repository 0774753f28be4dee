//! Artifact path helpers for tools that hand `perf record` an `-o` target.
//! Every artifact lives directly under a single directory named
//! `<uuid>.<extension>` so it satisfies the allow-list's artifact path
//! policy; the TTL sweep that reaps these is the server crate's job, not
//! this one's.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A fresh random artifact id — good enough for a filename, not a security
/// boundary.
pub fn new_artifact_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn artifact_path(dir: &Path, id: &str, extension: &str) -> PathBuf {
    dir.join(format!("{id}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_do_not_collide_across_calls() {
        let a = new_artifact_id();
        let b = new_artifact_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn path_joins_id_and_extension() {
        let p = artifact_path(Path::new("/tmp/perf-mcp/artifacts"), "deadbeef", "data");
        assert_eq!(p, Path::new("/tmp/perf-mcp/artifacts/deadbeef.data"));
    }
}
