//! Document store implementation using Rope for efficient text operations.

use lsp_types::{Position, TextDocumentContentChangeEvent, Url};
use ropey::Rope;
use tessera_carton::FxHashMap;

/// A document opened by the editor.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document URI
    pub uri: Url,
    /// Document version
    pub version: i32,
    /// Document content stored as a rope for efficient editing
    pub content: Rope,
    /// Language ID (e.g., "vue", "typescript")
    pub language_id: String,
}

impl Document {
    /// Create a new document.
    pub fn new(uri: Url, content: &str, version: i32, language_id: impl Into<String>) -> Self {
        Self {
            uri,
            version,
            content: Rope::from_str(content),
            language_id: language_id.into(),
        }
    }

    /// Get the document content as a string.
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Get the number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.content.len_lines()
    }

    /// Apply one change. Ranges use UTF-16 columns.
    pub fn apply_change(&mut self, change: &TextDocumentContentChangeEvent, new_version: i32) {
        self.version = new_version;

        let Some(range) = change.range else {
            self.content = Rope::from_str(&change.text);
            return;
        };
        let start = position_to_char(&self.content, range.start);
        let end = position_to_char(&self.content, range.end);
        if let (Some(start), Some(end)) = (start, end) {
            if start <= end {
                self.content.remove(start..end);
                self.content.insert(start, &change.text);
            }
        }
    }
}

/// Char index of an LSP position, clamped to the end of its line.
fn position_to_char(rope: &Rope, position: Position) -> Option<usize> {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return None;
    }
    let line_start = rope.line_to_char(line);
    let line_slice = rope.line(line);
    let mut line_len = line_slice.len_chars();
    // Exclude the line break
    if line_len > 0 && line_slice.char(line_len - 1) == '\n' {
        line_len -= 1;
        if line_len > 0 && line_slice.char(line_len - 1) == '\r' {
            line_len -= 1;
        }
    }
    let utf16_start = rope.char_to_utf16_cu(line_start);
    let utf16_end = rope.char_to_utf16_cu(line_start + line_len);
    let target = (utf16_start + position.character as usize).min(utf16_end);
    Some(rope.utf16_cu_to_char(target))
}

/// Open documents keyed by URI.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: FxHashMap<Url, Document>,
}

impl DocumentStore {
    /// Create a new document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new document.
    pub fn open(&mut self, uri: Url, content: &str, version: i32, language_id: impl Into<String>) {
        let doc = Document::new(uri.clone(), content, version, language_id);
        self.documents.insert(uri, doc);
    }

    /// Close a document.
    pub fn close(&mut self, uri: &Url) -> Option<Document> {
        self.documents.remove(uri)
    }

    /// Get a document by URI.
    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Apply changes to a document. Returns false for unknown documents.
    pub fn apply_changes(
        &mut self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> bool {
        let Some(doc) = self.documents.get_mut(uri) else {
            return false;
        };
        for change in changes {
            doc.apply_change(change, version);
        }
        true
    }

    /// Check if a document exists.
    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    /// Get all document URIs.
    pub fn uris(&self) -> Vec<Url> {
        self.documents.keys().cloned().collect()
    }

    /// Get the number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate over all documents.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }
}
