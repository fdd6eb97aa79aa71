//! Project host: one manifest, its watchers, snapshots and versions.
//!
//! Lifecycle: `Created -> Watching -> (Reparsing <-> Watching) -> Disposed`.
//! Every re-read of the manifest diffs the file-watcher set against the new
//! file list; a change in that set bumps the project version and queues a
//! validation sweep.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::Url;
use tessera_mosaic::{plain_script_document, SourceFile, SourceFiles, VirtualDocument};

use super::cancel::{PassTarget, RequestTracker, ValidationPass};
use super::config::HostOptions;
use super::error::{ProjectError, ProjectResult};
use super::fs::{FileSystem, WatchId};
use super::manifest::Manifest;
use super::snapshot::SnapshotCache;
use crate::document::DocumentStore;
use crate::service::LanguageServices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Created,
    Watching,
    Reparsing,
    Disposed,
}

pub struct ProjectHost {
    manifest: Manifest,
    fs: Arc<dyn FileSystem>,
    services: LanguageServices,
    options: HostOptions,
    state: HostState,
    manifest_watch: Option<WatchId>,
    directory_watch: Option<WatchId>,
    file_watches: BTreeMap<PathBuf, WatchId>,
    snapshots: SnapshotCache,
    files: SourceFiles,
    project_version: u64,
    /// Directory events seen since the last flush
    reparse_pending: bool,
    /// Primary documents of the queued sweep, if one is queued
    pending_validation: Option<Vec<Url>>,
    tracker: Arc<RequestTracker>,
}

impl ProjectHost {
    /// Read the manifest and start watching. Manifest and watch faults are
    /// fatal; registrations made before the fault are released.
    pub fn new(
        manifest_path: &Path,
        fs: Arc<dyn FileSystem>,
        services: LanguageServices,
        options: HostOptions,
    ) -> ProjectResult<Self> {
        let manifest = Manifest::read(fs.as_ref(), manifest_path, &options)?;
        let mut host = Self {
            manifest,
            fs,
            services,
            options,
            state: HostState::Created,
            manifest_watch: None,
            directory_watch: None,
            file_watches: BTreeMap::new(),
            snapshots: SnapshotCache::new(),
            files: SourceFiles::new(),
            project_version: 0,
            reparse_pending: false,
            pending_validation: None,
            tracker: Arc::new(RequestTracker::new()),
        };
        if let Err(error) = host.start_watching() {
            host.release_watches();
            host.state = HostState::Disposed;
            return Err(error);
        }
        host.state = HostState::Watching;
        tracing::info!(
            manifest = %host.manifest.path.display(),
            files = host.manifest.file_names.len(),
            "create project host"
        );
        Ok(host)
    }

    fn start_watching(&mut self) -> ProjectResult<()> {
        self.manifest_watch = Some(self.fs.watch_file(&self.manifest.path)?);
        self.directory_watch = Some(self.fs.watch_directory(&self.manifest.dir, true)?);
        self.sync_watchers()?;
        Ok(())
    }

    /// Bring the file watchers in line with the manifest's file list.
    /// Returns whether the set changed.
    fn sync_watchers(&mut self) -> ProjectResult<bool> {
        let removed: Vec<PathBuf> = self
            .file_watches
            .keys()
            .filter(|path| !self.manifest.contains(path))
            .cloned()
            .collect();
        let mut changed = !removed.is_empty();
        for path in removed {
            if let Some(id) = self.file_watches.remove(&path) {
                self.fs.unwatch(id);
            }
            self.snapshots.remove(&path);
            if let Some(uri) = path_to_uri(&path) {
                self.files.remove(&uri);
            }
        }

        for path in &self.manifest.file_names {
            if self.file_watches.contains_key(path) {
                continue;
            }
            let id = self.fs.watch_file(path)?;
            self.file_watches.insert(path.clone(), id);
            changed = true;
        }

        if changed {
            self.on_project_files_update(None);
        }
        Ok(changed)
    }

    fn on_project_files_update(&mut self, primary: Option<Url>) {
        self.project_version += 1;
        if !self.options.diagnostics {
            return;
        }
        let queued = self.pending_validation.get_or_insert_with(Vec::new);
        if let Some(uri) = primary {
            if !queued.contains(&uri) {
                queued.push(uri);
            }
        }
    }

    /// Re-read the manifest and diff the watchers.
    pub fn on_manifest_changed(&mut self) -> ProjectResult<()> {
        if self.is_disposed() {
            return Err(ProjectError::Disposed);
        }
        self.state = HostState::Reparsing;
        self.manifest = Manifest::read(self.fs.as_ref(), &self.manifest.path, &self.options)?;
        self.sync_watchers()?;
        self.state = HostState::Watching;
        Ok(())
    }

    /// Note a create/delete under the manifest directory. The re-read runs
    /// on the next [`flush`](Self::flush).
    pub fn on_directory_event(&mut self) {
        if !self.is_disposed() {
            self.reparse_pending = true;
        }
    }

    /// Run a debounced manifest re-read, if one is pending.
    pub fn flush(&mut self) -> ProjectResult<()> {
        if !self.reparse_pending || self.is_disposed() {
            return Ok(());
        }
        self.reparse_pending = false;
        self.on_manifest_changed()
    }

    /// A member changed on disk. Ignored while an editor owns the file.
    pub fn on_file_changed(&mut self, documents: &DocumentStore, path: &Path) {
        if self.is_disposed() || !self.manifest.contains(path) {
            return;
        }
        let Some(uri) = path_to_uri(path) else {
            return;
        };
        if documents.contains(&uri) {
            return;
        }
        self.snapshots.bump_watched(path);
        self.files.remove(&uri);
        self.on_project_files_update(None);
    }

    /// An open document's content changed. Returns whether the host's view
    /// of the file changed.
    pub fn on_document_changed(&mut self, documents: &DocumentStore, uri: &Url) -> bool {
        if self.is_disposed() {
            return false;
        }
        let (Some(path), Some(document)) = (uri_to_path(uri), documents.get(uri)) else {
            return false;
        };
        if !self.manifest.contains(&path) {
            return false;
        }
        let text = document.text();
        if !self.snapshots.record_content(&path, &text) {
            return false;
        }
        if self.options.is_composite(&path) {
            if let Some(key) = path_to_uri(&path) {
                match self.files.get_mut(&key) {
                    Some(file) => file.update(document.version, text),
                    None => {
                        let file = SourceFile::new(
                            key,
                            document.version,
                            text,
                            self.services.generator_options(),
                        );
                        self.files.insert(file);
                    }
                }
            }
        }
        self.on_project_files_update(Some(uri.clone()));
        true
    }

    /// The editor released a document; its disk content applies again.
    pub fn on_document_closed(&mut self, uri: &Url) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        if self.is_disposed() || !self.manifest.contains(&path) {
            return;
        }
        self.snapshots.bump_watched(&path);
        self.files.remove(uri);
        self.on_project_files_update(None);
    }

    /// Make sure the composite member at `path` is loaded; returns its key.
    pub fn load(&mut self, documents: &DocumentStore, path: &Path) -> Option<Url> {
        if self.is_disposed()
            || !self.manifest.contains(path)
            || !self.options.is_composite(path)
        {
            return None;
        }
        let uri = path_to_uri(path)?;
        if !self.files.contains(&uri) {
            let (text, version) = read_member(self.fs.as_ref(), documents, path)?;
            let file = SourceFile::new(
                uri.clone(),
                version.unwrap_or(0),
                text,
                self.services.generator_options(),
            );
            self.files.insert(file);
        }
        Some(uri)
    }

    /// Load every composite member, for features that cross files.
    pub fn load_all(&mut self, documents: &DocumentStore) {
        let paths: Vec<PathBuf> = self.manifest.file_names.iter().cloned().collect();
        for path in paths {
            self.load(documents, &path);
        }
    }

    pub fn source_files(&self) -> &SourceFiles {
        &self.files
    }

    pub fn source_file(&self, uri: &Url) -> Option<&SourceFile> {
        self.files.get(uri)
    }

    /// Snapshot of a member for the script engine.
    pub fn script_snapshot(&mut self, documents: &DocumentStore, path: &Path) -> Option<Arc<str>> {
        if self.is_disposed() || !self.manifest.contains(path) {
            return None;
        }
        let fs = self.fs.as_ref();
        self.snapshots
            .snapshot(path, || read_member(fs, documents, path).map(|(text, _)| text))
    }

    /// A plain script member as a document of its own, for the script
    /// engine. `None` for composite members.
    pub fn plain_script(
        &mut self,
        documents: &DocumentStore,
        path: &Path,
    ) -> Option<VirtualDocument> {
        if self.options.is_composite(path) {
            return None;
        }
        let text = self.script_snapshot(documents, path)?;
        let uri = path_to_uri(path)?;
        let version = documents.get(&uri).map_or(0, |document| document.version);
        Some(plain_script_document(uri, version, &text))
    }

    pub fn script_version(&self, path: &Path) -> String {
        self.snapshots.version(path)
    }

    /// Take the queued validation sweep, cancelling any running one.
    ///
    /// Order: primary documents, then open composite documents, then the
    /// remaining composite members.
    pub fn take_validation_pass(&mut self, documents: &DocumentStore) -> Option<ValidationPass> {
        if self.is_disposed() {
            return None;
        }
        let primary = self.pending_validation.take()?;

        let mut order: Vec<PathBuf> = primary.iter().filter_map(uri_to_path).collect();
        let mut open: Vec<PathBuf> = documents
            .iter()
            .filter_map(|document| uri_to_path(&document.uri))
            .filter(|path| self.manifest.contains(path))
            .collect();
        open.sort();
        for path in open.into_iter().chain(self.manifest.file_names.iter().cloned()) {
            if !order.contains(&path) {
                order.push(path);
            }
        }

        let mut targets = Vec::new();
        for path in order {
            let Some(uri) = self.load(documents, &path) else {
                continue;
            };
            let Some(file) = self.files.get(&uri) else {
                continue;
            };
            let version = documents.get(&uri).map(|document| document.version);
            targets.push(PassTarget {
                file: file.clone(),
                version,
            });
        }

        Some(ValidationPass::new(
            self.manifest.path.clone(),
            self.tracker.new_sweep(),
            targets,
            self.services.clone(),
            self.tracker.clone(),
        ))
    }

    /// Close every watcher and cancel outstanding work. Idempotent.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.state = HostState::Disposed;
        self.release_watches();
        self.tracker.cancel_all();
        self.pending_validation = None;
        self.reparse_pending = false;
        tracing::info!(manifest = %self.manifest.path.display(), "destroy project host");
    }

    fn release_watches(&mut self) {
        for (_, id) in std::mem::take(&mut self.file_watches) {
            self.fs.unwatch(id);
        }
        if let Some(id) = self.directory_watch.take() {
            self.fs.unwatch(id);
        }
        if let Some(id) = self.manifest_watch.take() {
            self.fs.unwatch(id);
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest.path
    }

    pub fn contains(&self, path: &Path) -> bool {
        !self.is_disposed() && self.manifest.contains(path)
    }

    pub fn project_version(&self) -> u64 {
        self.project_version
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == HostState::Disposed
    }

    pub fn has_pending_validation(&self) -> bool {
        self.pending_validation.is_some()
    }
}

impl std::fmt::Debug for ProjectHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectHost")
            .field("manifest", &self.manifest.path)
            .field("state", &self.state)
            .field("files", &self.manifest.file_names.len())
            .field("project_version", &self.project_version)
            .finish()
    }
}

/// Current text of a member: the open document if any, else the disk.
fn read_member(
    fs: &dyn FileSystem,
    documents: &DocumentStore,
    path: &Path,
) -> Option<(String, Option<i32>)> {
    if let Some(document) = path_to_uri(path).and_then(|uri| documents.get(&uri)) {
        return Some((document.text(), Some(document.version)));
    }
    match fs.read_to_string(path) {
        Ok(text) => Some((text, None)),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "cannot read project file");
            None
        }
    }
}

pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

pub(crate) fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}
