//! Rename refactoring.
//!
//! Edits the script engine proposes for virtual documents are mapped back
//! to their owners through `references`-capable entries. One composite
//! range is edited at most once, even when several generated sites map to
//! it.

use std::collections::HashMap;

use lsp_types::{Position, TextEdit, Url, WorkspaceEdit};
use tessera_mosaic::{Capabilities, SourceFile, SourceFiles, SurfaceFamily};

use super::point;
use crate::service::LanguageServices;

/// Rename service.
pub struct RenameService;

impl RenameService {
    pub fn rename(
        files: &SourceFiles,
        file: &SourceFile,
        services: &LanguageServices,
        position: Position,
        new_name: &str,
    ) -> Option<WorkspaceEdit> {
        let service = services.script.as_deref()?;
        let source = file.line_index();
        let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();

        for doc in file.virtual_documents().family(SurfaceFamily::Script) {
            for target in doc.source_to_target(source, point(position), Capabilities::REFERENCES) {
                let Some(edit) = service.rename(doc, target.start, new_name) else {
                    continue;
                };
                for (uri, edits) in edit.changes.unwrap_or_default() {
                    for edit in edits {
                        map_edit(files, &mut changes, &uri, edit);
                    }
                }
            }
        }

        if changes.is_empty() {
            return None;
        }
        Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        })
    }
}

fn map_edit(
    files: &SourceFiles,
    changes: &mut HashMap<Url, Vec<TextEdit>>,
    uri: &Url,
    edit: TextEdit,
) {
    let Some((owner, doc)) = files.find_by_virtual_uri(uri) else {
        push_unique(changes.entry(uri.clone()).or_default(), edit);
        return;
    };
    let ranges = doc.target_to_source(owner.line_index(), edit.range, Capabilities::REFERENCES);
    let edits = changes.entry(owner.uri().clone()).or_default();
    for range in ranges {
        push_unique(edits, TextEdit::new(range, edit.new_text.clone()));
    }
}

fn push_unique(edits: &mut Vec<TextEdit>, edit: TextEdit) {
    if !edits.iter().any(|e| e.range == edit.range) {
        edits.push(edit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::test_utils::{range_of, source_file, word_at};
    use crate::service::EmbeddedService;
    use std::sync::Arc;
    use tessera_mosaic::VirtualDocument;

    /// Renames every whole-word occurrence in every document.
    struct ScriptEngine {
        docs: Vec<VirtualDocument>,
    }

    impl EmbeddedService for ScriptEngine {
        fn rename(
            &self,
            doc: &VirtualDocument,
            position: Position,
            new_name: &str,
        ) -> Option<WorkspaceEdit> {
            let (word, _) = word_at(doc, position)?;
            let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();
            for doc in self.docs.iter().filter(|d| d.kind.family() == SurfaceFamily::Script) {
                for (i, _) in doc.text().match_indices(word.as_str()) {
                    let at = doc.index.offset_to_position(i as u32);
                    if word_at(doc, at).map(|(w, _)| w).as_deref() == Some(word.as_str()) {
                        let range = doc.index.span_to_range(i as u32, (i + word.len()) as u32);
                        changes
                            .entry(doc.uri.clone())
                            .or_default()
                            .push(TextEdit::new(range, new_name.to_string()));
                    }
                }
            }
            Some(WorkspaceEdit {
                changes: Some(changes),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_rename_component_and_binding() {
        let text = "<script setup>\nconst item = 1\n</script>\n<template><Card :value=\"item\">{{ item }}</Card></template>";
        let file = source_file(text);
        let mut files = SourceFiles::new();
        files.insert(file.clone());
        let services = LanguageServices {
            script: Some(Arc::new(ScriptEngine {
                docs: file.virtual_documents().iter().cloned().collect(),
            })),
            ..Default::default()
        };

        let at = range_of(text, "item", 2).start;
        let edit = RenameService::rename(&files, &file, &services, at, "entry").unwrap();
        let changes = edit.changes.unwrap();
        assert_eq!(changes.len(), 1);
        let mut ranges: Vec<_> = changes[file.uri()].iter().map(|e| e.range).collect();
        ranges.sort_by_key(|r| (r.start.line, r.start.character));
        // The prop expression appears twice in generated code but is edited once
        assert_eq!(
            ranges,
            vec![
                range_of(text, "item", 0),
                range_of(text, "item", 1),
                range_of(text, "item", 2),
            ]
        );
    }

    #[test]
    fn test_nothing_to_rename() {
        let text = "<template><p>static</p></template>";
        let file = source_file(text);
        let files = SourceFiles::new();
        let services = LanguageServices {
            script: Some(Arc::new(ScriptEngine { docs: Vec::new() })),
            ..Default::default()
        };
        let at = range_of(text, "static", 0).start;
        assert!(RenameService::rename(&files, &file, &services, at, "x").is_none());
    }
}
