//! Persisted version cache.
//!
//! The cache is a single JSON object:
//!
//! ```json
//! {"latestVersion":"0.45.1","dismissedVersion":"0.45.0"}
//! ```
//!
//! Reads and writes never fail from the caller's point of view. A missing or
//! corrupt file reads as "no cache" and a failed write is logged and dropped.
//! There is no locking: the file is read and rewritten non-atomically, and
//! concurrent writers resolve by whoever finishes last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::UpdateResult;

/// Cached knowledge about the latest published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCache {
    /// Last version string fetched from the registry
    pub latest_version: String,
    /// Version the user chose to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_version: Option<String>,
}

impl VersionCache {
    pub fn new(latest_version: impl Into<String>) -> Self {
        Self {
            latest_version: latest_version.into(),
            dismissed_version: None,
        }
    }

    pub fn with_dismissed(mut self, version: impl Into<String>) -> Self {
        self.dismissed_version = Some(version.into());
        self
    }

    /// Whether the dismissal applies to the current latest version.
    ///
    /// Compared by string equality, so a newer fetch silently lifts an older
    /// dismissal.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed_version.as_deref() == Some(self.latest_version.as_str())
    }
}

/// Handle on the cache file.
#[derive(Debug, Clone)]
pub struct UpdateCache {
    path: PathBuf,
}

impl UpdateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache, treating any failure as "no cache".
    pub fn read(&self) -> Option<VersionCache> {
        match self.try_read() {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::debug!("No usable update cache at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist the cache, logging and swallowing any failure.
    pub fn write(&self, cache: &VersionCache) {
        if let Err(e) = self.try_write(cache) {
            tracing::debug!(
                "Failed to write update cache to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Record that the user skipped `version`.
    ///
    /// Does nothing when there is no cache yet.
    pub fn dismiss(&self, version: &str) {
        let Some(mut cache) = self.read() else {
            return;
        };
        cache.dismissed_version = Some(version.to_string());
        self.write(&cache);
    }

    /// Store a freshly fetched version, keeping whatever dismissal is on disk
    /// at the moment of writing.
    pub fn record_latest(&self, latest: &str) -> VersionCache {
        let cache = VersionCache {
            latest_version: latest.to_string(),
            dismissed_version: self.read().and_then(|c| c.dismissed_version),
        };
        self.write(&cache);
        cache
    }

    fn try_read(&self) -> UpdateResult<VersionCache> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn try_write(&self, cache: &VersionCache) -> UpdateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = serde_json::to_string(cache)?;
        content.push('\n');
        std::fs::write(&self.path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> UpdateCache {
        UpdateCache::new(dir.path().join("agent").join("update-cache.json"))
    }

    #[test]
    fn test_round_trip_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.write(&VersionCache::new("2.0.0"));

        assert_eq!(cache.read(), Some(VersionCache::new("2.0.0")));
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.write(&VersionCache::new("2.0.0"));
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(raw, "{\"latestVersion\":\"2.0.0\"}\n");

        cache.write(&VersionCache::new("2.0.0").with_dismissed("1.9.0"));
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(
            raw,
            "{\"latestVersion\":\"2.0.0\",\"dismissedVersion\":\"1.9.0\"}\n"
        );
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(cache_in(&dir).read(), None);
    }

    #[test]
    fn test_read_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();

        std::fs::write(cache.path(), "{not json").unwrap();
        assert_eq!(cache.read(), None);

        std::fs::write(cache.path(), "{\"dismissedVersion\":\"1.0.0\"}").unwrap();
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // Parent "directory" is a regular file, so create_dir_all fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let cache = UpdateCache::new(blocker.join("update-cache.json"));

        cache.write(&VersionCache::new("2.0.0"));
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn test_dismiss_without_cache_is_noop() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.dismiss("2.0.0");

        assert!(!cache.path().exists());
    }

    #[test]
    fn test_dismiss_sets_version() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.write(&VersionCache::new("2.0.0"));

        cache.dismiss("2.0.0");

        let stored = cache.read().unwrap();
        assert_eq!(stored.dismissed_version.as_deref(), Some("2.0.0"));
        assert!(stored.is_dismissed());
    }

    #[test]
    fn test_record_latest_keeps_dismissal() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.write(&VersionCache::new("2.0.0").with_dismissed("2.0.0"));

        let stored = cache.record_latest("2.0.1");

        assert_eq!(stored, VersionCache::new("2.0.1").with_dismissed("2.0.0"));
        assert_eq!(cache.read(), Some(stored.clone()));
        assert!(!stored.is_dismissed());
    }

    #[test]
    fn test_record_latest_without_cache() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let stored = cache.record_latest("1.0.0");

        assert_eq!(stored, VersionCache::new("1.0.0"));
        assert_eq!(cache.read(), Some(stored));
    }
}
