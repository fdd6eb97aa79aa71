//! Go to definition.
//!
//! Script surfaces only. Locations the script engine reports inside any
//! virtual document of the project are mapped back to that document's
//! owner; other locations pass through.

use lsp_types::{Location, Position};
use tessera_mosaic::{Capabilities, SourceFile, SourceFiles, SurfaceFamily, VirtualDocument};

use super::{extend_unique, map_location, point};
use crate::service::LanguageServices;

/// Definition service.
pub struct DefinitionService;

impl DefinitionService {
    pub fn definition(
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
                for location in service.definition(doc, target.start) {
                    extend_unique(
                        &mut result,
                        map_location(files, location, Capabilities::REFERENCES),
                    );
                }
            }
        }
        result
    }

    /// Definition from a plain script file. The position is already in the
    /// document's own coordinates.
    pub fn script_definition(
        files: &SourceFiles,
        doc: &VirtualDocument,
        services: &LanguageServices,
        position: Position,
    ) -> Vec<Location> {
        let Some(service) = services.script.as_deref() else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for location in service.definition(doc, position) {
            extend_unique(
                &mut result,
                map_location(files, location, Capabilities::REFERENCES),
            );
        }
        result
    }
}
