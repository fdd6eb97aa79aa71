//! Multi-project manager.
//!
//! Owns every [`ProjectHost`] under a workspace root, keyed by manifest
//! path, together with the open documents. Requests for a composite
//! document are routed to the single project that owns it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::{
    Color, ColorPresentation, FormattingOptions, Hover, Location, Position, Range,
    TextDocumentContentChangeEvent, TextEdit, Url, WorkspaceEdit,
};
use tessera_mosaic::{SourceFile, SourceFiles, VirtualDocument};

use super::cancel::ValidationPass;
use super::config::HostOptions;
use super::error::ProjectResult;
use super::fs::{FileEvent, FileEventKind, FileSystem, WatchId};
use super::host::{uri_to_path, ProjectHost};
use crate::document::DocumentStore;
use crate::ide::{
    ColorService, DefinitionService, FormattingService, HoverService, ReferencesService,
    RenameService,
};
use crate::service::LanguageServices;

pub struct ProjectManager {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    services: LanguageServices,
    options: HostOptions,
    documents: DocumentStore,
    hosts: BTreeMap<PathBuf, ProjectHost>,
    root_watch: Option<WatchId>,
}

impl ProjectManager {
    /// Discover and host every manifest under `root`. A failing root watch
    /// is fatal; a failing project is logged and skipped.
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        services: LanguageServices,
        options: HostOptions,
    ) -> ProjectResult<Self> {
        let root = root.into();
        let root_watch = fs.watch_directory(&root, true)?;
        let mut manager = Self {
            root,
            fs,
            services,
            options,
            documents: DocumentStore::new(),
            hosts: BTreeMap::new(),
            root_watch: Some(root_watch),
        };
        for manifest in manager.discover_manifests() {
            manager.add_host(&manifest);
        }
        Ok(manager)
    }

    fn discover_manifests(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = self.fs.read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                if self.fs.is_dir(&entry) {
                    if !self.options.is_skipped_directory(&entry) {
                        stack.push(entry);
                    }
                } else if self.options.is_manifest(&entry) {
                    found.push(entry);
                }
            }
        }
        found.sort();
        found
    }

    fn add_host(&mut self, manifest: &Path) {
        match ProjectHost::new(
            manifest,
            self.fs.clone(),
            self.services.clone(),
            self.options.clone(),
        ) {
            Ok(mut host) => {
                for document in self.documents.iter() {
                    host.on_document_changed(&self.documents, &document.uri);
                }
                self.hosts.insert(manifest.to_path_buf(), host);
            }
            Err(error) => {
                tracing::warn!(manifest = %manifest.display(), %error, "skip project");
            }
        }
    }

    fn remove_host(&mut self, manifest: &Path) {
        if let Some(mut host) = self.hosts.remove(manifest) {
            host.dispose();
        }
    }

    /// Route a file-system notification.
    pub fn on_file_event(&mut self, event: FileEvent) {
        let path = event.path.as_path();
        if self.options.is_manifest(path) {
            if !self.fs.exists(path) {
                self.remove_host(path);
            } else if let Some(host) = self.hosts.get_mut(path) {
                if let Err(error) = host.on_manifest_changed() {
                    tracing::warn!(manifest = %path.display(), %error, "manifest reparse failed");
                    self.remove_host(path);
                }
            } else {
                self.add_host(path);
            }
            return;
        }

        match event.kind {
            FileEventKind::Created | FileEventKind::Deleted => {
                for host in self.hosts.values_mut() {
                    if path.starts_with(&host.manifest().dir) {
                        host.on_directory_event();
                    }
                }
            }
            FileEventKind::Changed => {
                for host in self.hosts.values_mut() {
                    host.on_file_changed(&self.documents, path);
                }
            }
        }
    }

    /// Run the debounced directory re-reads. Hosts whose manifest no longer
    /// reads are disposed.
    pub fn flush_deferred(&mut self) {
        let mut failed = Vec::new();
        for (manifest, host) in self.hosts.iter_mut() {
            if let Err(error) = host.flush() {
                tracing::warn!(manifest = %manifest.display(), %error, "manifest reparse failed");
                failed.push(manifest.clone());
            }
        }
        for manifest in failed {
            self.remove_host(&manifest);
        }
    }

    /// Manifest of the project owning `path`.
    ///
    /// Among the projects listing the file, those whose manifest directory
    /// is an ancestor of the file win; then the deepest manifest directory;
    /// then the lexicographically smallest manifest path.
    pub fn project_for(&self, path: &Path) -> Option<&Path> {
        self.hosts
            .iter()
            .filter(|(_, host)| host.contains(path))
            .max_by(|(a, host_a), (b, host_b)| {
                let key_a = (path.starts_with(&host_a.manifest().dir), depth(&host_a.manifest().dir));
                let key_b = (path.starts_with(&host_b.manifest().dir), depth(&host_b.manifest().dir));
                key_a.cmp(&key_b).then_with(|| b.cmp(a))
            })
            .map(|(manifest, _)| manifest.as_path())
    }

    pub fn project(&self, manifest: &Path) -> Option<&ProjectHost> {
        self.hosts.get(manifest)
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectHost> {
        self.hosts.values()
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn open_document(&mut self, uri: Url, text: &str, version: i32, language_id: &str) {
        self.documents.open(uri.clone(), text, version, language_id);
        self.notify_changed(&uri);
    }

    pub fn change_document(
        &mut self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> bool {
        if !self.documents.apply_changes(uri, changes, version) {
            return false;
        }
        self.notify_changed(uri);
        true
    }

    pub fn close_document(&mut self, uri: &Url) {
        if self.documents.close(uri).is_none() {
            return;
        }
        for host in self.hosts.values_mut() {
            host.on_document_closed(uri);
        }
    }

    fn notify_changed(&mut self, uri: &Url) {
        for host in self.hosts.values_mut() {
            host.on_document_changed(&self.documents, uri);
        }
    }

    /// Queued validation sweeps, one per project with pending changes.
    pub fn take_validation_passes(&mut self) -> Vec<ValidationPass> {
        self.hosts
            .values_mut()
            .filter_map(|host| host.take_validation_pass(&self.documents))
            .collect()
    }

    /// Run `f` against the owned composite document `uri`. `cross_file`
    /// loads every composite member first so that locations in other
    /// documents can be mapped back.
    fn with_file<R>(
        &mut self,
        uri: &Url,
        cross_file: bool,
        f: impl FnOnce(&SourceFiles, &SourceFile, &LanguageServices) -> R,
    ) -> Option<R> {
        let path = uri_to_path(uri)?;
        if !self.options.is_composite(&path) {
            return None;
        }
        let manifest = self.project_for(&path)?.to_path_buf();
        let host = self.hosts.get_mut(&manifest)?;
        if cross_file {
            host.load_all(&self.documents);
        }
        let key = host.load(&self.documents, &path)?;
        let files = host.source_files();
        let file = files.get(&key)?;
        Some(f(files, file, &self.services))
    }

    /// Run `f` against a plain script member `uri`, seen as its own
    /// document.
    fn with_plain_script<R>(
        &mut self,
        uri: &Url,
        cross_file: bool,
        f: impl FnOnce(&SourceFiles, &VirtualDocument, &LanguageServices) -> R,
    ) -> Option<R> {
        let path = uri_to_path(uri)?;
        if self.options.is_composite(&path) {
            return None;
        }
        let manifest = self.project_for(&path)?.to_path_buf();
        let host = self.hosts.get_mut(&manifest)?;
        if cross_file {
            host.load_all(&self.documents);
        }
        let doc = host.plain_script(&self.documents, &path)?;
        Some(f(host.source_files(), &doc, &self.services))
    }

    /// Hover. Plain script members go straight to the script engine.
    pub fn hover(&mut self, uri: &Url, position: Position) -> Option<Hover> {
        if let Some(hover) = self.with_plain_script(uri, false, |_, doc, services| {
            services.script.as_deref()?.hover(doc, position)
        }) {
            return hover;
        }
        self.with_file(uri, false, |_, file, services| {
            HoverService::hover(file, services, position)
        })?
    }

    pub fn color_presentations(
        &mut self,
        uri: &Url,
        color: Color,
        range: Range,
    ) -> Option<Vec<ColorPresentation>> {
        self.with_file(uri, false, |_, file, services| {
            ColorService::color_presentations(file, services, color, range)
        })
    }

    pub fn format_range(
        &mut self,
        uri: &Url,
        range: Range,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        self.with_file(uri, false, |_, file, services| {
            FormattingService::format_range(file, services, range, options)
        })?
    }

    pub fn format_document(
        &mut self,
        uri: &Url,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        self.with_file(uri, false, |_, file, services| {
            FormattingService::format_document(file, services, options)
        })?
    }

    pub fn definition(&mut self, uri: &Url, position: Position) -> Option<Vec<Location>> {
        if let Some(locations) = self.with_plain_script(uri, true, |files, doc, services| {
            DefinitionService::script_definition(files, doc, services, position)
        }) {
            return Some(locations);
        }
        self.with_file(uri, true, |files, file, services| {
            DefinitionService::definition(files, file, services, position)
        })
    }

    pub fn references(&mut self, uri: &Url, position: Position) -> Option<Vec<Location>> {
        self.with_file(uri, true, |files, file, services| {
            ReferencesService::references(files, file, services, position)
        })
    }

    pub fn rename(&mut self, uri: &Url, position: Position, new_name: &str) -> Option<WorkspaceEdit> {
        self.with_file(uri, true, |files, file, services| {
            RenameService::rename(files, file, services, position, new_name)
        })?
    }

    /// Dispose one project. Returns whether it existed.
    pub fn dispose_project(&mut self, manifest: &Path) -> bool {
        let existed = self.hosts.contains_key(manifest);
        self.remove_host(manifest);
        existed
    }

    /// Dispose every project and stop watching the root.
    pub fn dispose(&mut self) {
        for (_, mut host) in std::mem::take(&mut self.hosts) {
            host.dispose();
        }
        if let Some(id) = self.root_watch.take() {
            self.fs.unwatch(id);
        }
    }
}

impl std::fmt::Debug for ProjectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectManager")
            .field("root", &self.root)
            .field("projects", &self.hosts.keys().collect::<Vec<_>>())
            .field("documents", &self.documents.len())
            .finish()
    }
}

fn depth(path: &Path) -> usize {
    path.components().count()
}
