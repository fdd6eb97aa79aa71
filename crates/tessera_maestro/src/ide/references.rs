//! Find references.

use lsp_types::{Location, Position};
use tessera_mosaic::{Capabilities, SourceFile, SourceFiles, SurfaceFamily};

use super::{extend_unique, map_location, point};
use crate::service::LanguageServices;

/// References service: the union of every script surface's answer,
/// de-duplicated by location.
pub struct ReferencesService;

impl ReferencesService {
    pub fn references(
        files: &SourceFiles,
        file: &SourceFile,
        services: &LanguageServices,
        position: Position,
    ) -> Vec<Location> {
        let Some(service) = services.script.as_deref() else {
            return Vec::new();
        };
        let source = file.line_index();
        let mut result = Vec::new();
        for doc in file.virtual_documents().family(SurfaceFamily::Script) {
            for target in doc.source_to_target(source, point(position), Capabilities::REFERENCES) {
                for location in service.references(doc, target.start) {
                    extend_unique(
                        &mut result,
                        map_location(files, location, Capabilities::REFERENCES),
                    );
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::test_utils::{range_of, source_file, word_at};
    use crate::service::EmbeddedService;
    use std::sync::Arc;
    use tessera_mosaic::VirtualDocument;

    /// Every whole-word occurrence of the identifier in every document.
    struct ScriptEngine {
        docs: Vec<VirtualDocument>,
    }

    impl EmbeddedService for ScriptEngine {
        fn references(&self, doc: &VirtualDocument, position: Position) -> Vec<Location> {
            let Some((word, _)) = word_at(doc, position) else {
                return Vec::new();
            };
            let mut result = Vec::new();
            for doc in &self.docs {
                for (i, _) in doc.text().match_indices(word.as_str()) {
                    let at = doc.index.offset_to_position(i as u32);
                    if word_at(doc, at).map(|(w, _)| w) == Some(word.clone()) {
                        let range = doc.index.span_to_range(i as u32, (i + word.len()) as u32);
                        result.push(Location::new(doc.uri.clone(), range));
                    }
                }
            }
            result
        }
    }

    #[test]
    fn test_references_are_unique_and_mapped() {
        let text = "<script setup>\nconst count = 0\n</script>\n<template><p :title=\"count\">{{ count }}</p></template>";
        let file = source_file(text);
        let mut files = SourceFiles::new();
        files.insert(file.clone());
        let services = LanguageServices {
            script: Some(Arc::new(ScriptEngine {
                docs: file.virtual_documents().iter().cloned().collect(),
            })),
            ..Default::default()
        };

        // From the script declaration and from the template use
        for nth in [0, 2] {
            let at = range_of(text, "count", nth).start;
            let result = ReferencesService::references(&files, &file, &services, at);
            let ranges: Vec<_> = result.iter().map(|l| l.range).collect();
            assert_eq!(
                ranges,
                vec![
                    range_of(text, "count", 0),
                    range_of(text, "count", 1),
                    range_of(text, "count", 2),
                ]
            );
        }
    }
}
