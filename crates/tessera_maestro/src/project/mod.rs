//! Project hosting.
//!
//! A [`ProjectManager`] discovers manifests under a workspace root and keeps
//! one [`ProjectHost`] per manifest. Hosts mirror their manifest's file list
//! with watchers, version script snapshots and queue validation sweeps.

mod cancel;
mod config;
mod error;
mod fs;
mod host;
mod manager;
mod manifest;
mod snapshot;

pub use cancel::{DiagnosticPublisher, RequestTracker, ValidationPass};
pub use config::HostOptions;
pub use error::{ManifestError, ProjectError, ProjectResult, WatchError};
pub use fs::{FileEvent, FileEventKind, FileSystem, MemoryFileSystem, OsFileSystem, WatchId};
pub use host::{HostState, ProjectHost};
pub use manager::ProjectManager;
pub use manifest::Manifest;
pub use snapshot::SnapshotCache;
