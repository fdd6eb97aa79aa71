//! File-system abstraction.
//!
//! Hosts read manifests and members and register watches through
//! [`FileSystem`]. [`OsFileSystem`] sends what its watchers observe down a
//! channel; the embedding layer feeds those [`FileEvent`]s back to the
//! [`ProjectManager`](super::ProjectManager).

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use super::error::WatchError;

/// Handle of one watch registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Changed,
    Deleted,
}

/// A change observed under a watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate children of a directory, sorted.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn watch_file(&self, path: &Path) -> Result<WatchId, WatchError>;

    fn watch_directory(&self, path: &Path, recursive: bool) -> Result<WatchId, WatchError>;

    /// Close a registration. Unknown ids are ignored.
    fn unwatch(&self, id: WatchId);
}

#[derive(Debug, Clone)]
struct Watch {
    path: PathBuf,
    recursive: bool,
}

/// Registration table shared by both backends.
#[derive(Debug, Default)]
struct Watches {
    next: u64,
    active: BTreeMap<WatchId, Watch>,
}

impl Watches {
    fn register(&mut self, path: &Path, recursive: bool) -> WatchId {
        self.next += 1;
        let id = WatchId(self.next);
        self.active.insert(
            id,
            Watch {
                path: path.to_path_buf(),
                recursive,
            },
        );
        id
    }

    fn unregister(&mut self, id: WatchId) {
        self.active.remove(&id);
    }

    fn is_registered(&self, path: &Path) -> bool {
        self.active.values().any(|watch| watch.path == path)
    }

    fn is_watched(&self, path: &Path) -> bool {
        self.active.values().any(|watch| {
            watch.path == path || (watch.recursive && path.starts_with(&watch.path))
        })
    }
}

/// In-memory file system. Directories exist implicitly above every file.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, String>,
    watches: Watches,
    rejected: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.state.write().files.insert(path.into(), text.into());
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.state.write().files.remove(path)
    }

    /// Make every later watch request for `path` fail.
    pub fn reject_watch(&self, path: impl Into<PathBuf>) {
        self.state.write().rejected.insert(path.into());
    }

    /// Number of open registrations.
    pub fn active_watches(&self) -> usize {
        self.state.read().watches.active.len()
    }

    /// Whether a registration covers `path`.
    pub fn is_watched(&self, path: &Path) -> bool {
        self.state.read().watches.is_watched(path)
    }

    /// Whether a registration was made for exactly `path`.
    pub fn is_registered(&self, path: &Path) -> bool {
        self.state.read().watches.is_registered(path)
    }

    fn watch(&self, path: &Path, recursive: bool, is_dir: bool) -> Result<WatchId, WatchError> {
        let mut state = self.state.write();
        if state.rejected.contains(path) {
            return Err(WatchError::Rejected {
                path: path.to_path_buf(),
                message: "rejected by file system".to_string(),
            });
        }
        let found = if is_dir {
            state.is_dir(path)
        } else {
            state.files.contains_key(path)
        };
        if !found {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        Ok(state.watches.register(path, recursive))
    }
}

impl MemoryState {
    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.state
            .read()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read();
        state.files.contains_key(path) || state.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.read().is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state.read();
        if !state.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            ));
        }
        let children: BTreeSet<PathBuf> = state
            .files
            .keys()
            .filter_map(|file| {
                let first = file.strip_prefix(path).ok()?.components().next()?;
                Some(path.join(first))
            })
            .collect();
        Ok(children.into_iter().collect())
    }

    fn watch_file(&self, path: &Path) -> Result<WatchId, WatchError> {
        self.watch(path, false, false)
    }

    fn watch_directory(&self, path: &Path, recursive: bool) -> Result<WatchId, WatchError> {
        self.watch(path, recursive, true)
    }

    fn unwatch(&self, id: WatchId) {
        self.state.write().watches.unregister(id);
    }
}

/// `std::fs` backed file system. Every registration owns a native watcher
/// whose events are sent to the receiver returned by [`OsFileSystem::new`].
pub struct OsFileSystem {
    events: mpsc::UnboundedSender<FileEvent>,
    state: Mutex<OsState>,
}

#[derive(Default)]
struct OsState {
    watches: Watches,
    watchers: BTreeMap<WatchId, RecommendedWatcher>,
}

impl OsFileSystem {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FileEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let fs = Self {
            events,
            state: Mutex::new(OsState::default()),
        };
        (fs, receiver)
    }

    pub fn active_watches(&self) -> usize {
        self.state.lock().watches.active.len()
    }

    fn watch(&self, path: &Path, recursive: bool) -> Result<WatchId, WatchError> {
        let events = self.events.clone();
        let rejected = |error: notify::Error| WatchError::Rejected {
            path: path.to_path_buf(),
            message: error.to_string(),
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let Some(kind) = event_kind(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if events.send(FileEvent::new(path, kind)).is_err() {
                            tracing::debug!("file event receiver dropped");
                            return;
                        }
                    }
                }
                Err(error) => tracing::warn!(%error, "file watch error"),
            }
        })
        .map_err(rejected)?;
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(path, mode).map_err(rejected)?;

        let mut state = self.state.lock();
        let id = state.watches.register(path, recursive);
        state.watchers.insert(id, watcher);
        Ok(id)
    }
}

impl std::fmt::Debug for OsFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsFileSystem")
            .field("watches", &self.state.lock().watches)
            .finish()
    }
}

fn event_kind(kind: &EventKind) -> Option<FileEventKind> {
    match kind {
        EventKind::Create(_) => Some(FileEventKind::Created),
        EventKind::Modify(_) => Some(FileEventKind::Changed),
        EventKind::Remove(_) => Some(FileEventKind::Deleted),
        _ => None,
    }
}

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn watch_file(&self, path: &Path) -> Result<WatchId, WatchError> {
        if !path.is_file() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        self.watch(path, false)
    }

    fn watch_directory(&self, path: &Path, recursive: bool) -> Result<WatchId, WatchError> {
        if !path.is_dir() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        self.watch(path, recursive)
    }

    fn unwatch(&self, id: WatchId) {
        let mut state = self.state.lock();
        state.watches.unregister(id);
        // Dropping the watcher stops it
        state.watchers.remove(&id);
    }
}

/// Resolve `.` and `..` components without touching the file system.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
