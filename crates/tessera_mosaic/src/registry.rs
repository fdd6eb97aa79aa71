//! Registry of source files, addressable by composite or virtual URI.

use tessera_carton::lsp_types::Url;
use tessera_carton::FxHashMap;

use crate::{SourceFile, VirtualDocument};

/// Marker every virtual document suffix starts with.
const VIRTUAL_MARKER: &str = ".__";

/// Source files keyed by composite-document URI.
#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    files: FxHashMap<Url, SourceFile>,
}

impl SourceFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the file at its URI.
    pub fn insert(&mut self, file: SourceFile) -> Option<SourceFile> {
        self.files.insert(file.uri().clone(), file)
    }

    pub fn get(&self, uri: &Url) -> Option<&SourceFile> {
        self.files.get(uri)
    }

    pub fn get_mut(&mut self, uri: &Url) -> Option<&mut SourceFile> {
        self.files.get_mut(uri)
    }

    pub fn remove(&mut self, uri: &Url) -> Option<SourceFile> {
        self.files.remove(uri)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.files.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    /// Every virtual document of every file.
    pub fn virtual_documents(&self) -> impl Iterator<Item = (&SourceFile, &VirtualDocument)> {
        self.files
            .values()
            .flat_map(|file| file.virtual_documents().iter().map(move |doc| (file, doc)))
    }

    /// Resolve a virtual URI to its owner and document.
    pub fn find_by_virtual_uri(&self, uri: &Url) -> Option<(&SourceFile, &VirtualDocument)> {
        if let Some(owner) = owner_uri(uri) {
            if let Some(file) = self.files.get(&owner) {
                if let Some(doc) = file.find_virtual(uri) {
                    return Some((file, doc));
                }
            }
        }
        // Composite URIs that themselves contain the marker
        self.virtual_documents().find(|(_, doc)| &doc.uri == uri)
    }
}

/// Composite URI a virtual URI was derived from.
fn owner_uri(uri: &Url) -> Option<Url> {
    let s = uri.as_str();
    let cut = s.rfind(VIRTUAL_MARKER)?;
    Url::parse(&s[..cut]).ok()
}
