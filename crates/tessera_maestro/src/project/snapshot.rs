//! Version-tagged script snapshots.
//!
//! Files bound to open documents are versioned by content hash, so a no-op
//! edit leaves the version alone. Files only seen through the watcher get a
//! counter instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tessera_carton::{hash::content_version, FxHashMap};

#[derive(Debug, Default)]
pub struct SnapshotCache {
    versions: FxHashMap<PathBuf, String>,
    snapshots: FxHashMap<PathBuf, (String, Arc<str>)>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record open-document content. Returns whether the version changed.
    pub fn record_content(&mut self, path: &Path, text: &str) -> bool {
        let version = content_version(text);
        if self.versions.get(path) == Some(&version) {
            return false;
        }
        self.versions.insert(path.to_path_buf(), version);
        true
    }

    /// Advance the counter of a watched file. A hash version restarts it.
    pub fn bump_watched(&mut self, path: &Path) {
        let next = match self.versions.get(path).map(|v| v.parse::<u64>()) {
            Some(Ok(n)) => (n + 1).to_string(),
            _ => "0".to_string(),
        };
        self.versions.insert(path.to_path_buf(), next);
    }

    /// Current version string; empty when the file was never recorded.
    pub fn version(&self, path: &Path) -> String {
        self.versions.get(path).cloned().unwrap_or_default()
    }

    /// Snapshot for the current version, reading the text only on a miss.
    pub fn snapshot(
        &mut self,
        path: &Path,
        read: impl FnOnce() -> Option<String>,
    ) -> Option<Arc<str>> {
        let version = self.version(path);
        if let Some((cached, snapshot)) = self.snapshots.get(path) {
            if *cached == version {
                return Some(snapshot.clone());
            }
        }
        let snapshot: Arc<str> = Arc::from(read()?);
        self.snapshots
            .insert(path.to_path_buf(), (version, snapshot.clone()));
        Some(snapshot)
    }

    pub fn remove(&mut self, path: &Path) {
        self.versions.remove(path);
        self.snapshots.remove(path);
    }
}
