//! Hover information provider.
//!
//! Each surface family (script, markup, style) answers with its first hit.
//! When more than one family answers, the contents are concatenated in that
//! order and the range comes from the first family that reported one.

use lsp_types::{Hover, HoverContents, MarkedString, Position};
use tessera_mosaic::{Capabilities, SourceFile, SurfaceFamily};

use super::point;
use crate::service::{EmbeddedService, LanguageServices};

const FAMILIES: [SurfaceFamily; 3] = [
    SurfaceFamily::Script,
    SurfaceFamily::Markup,
    SurfaceFamily::Style,
];

/// Hover service dispatching to every surface family.
pub struct HoverService;

impl HoverService {
    pub fn hover(
        file: &SourceFile,
        services: &LanguageServices,
        position: Position,
    ) -> Option<Hover> {
        let mut hovers: Vec<Hover> = FAMILIES
            .iter()
            .filter_map(|family| {
                let service = services.for_family(*family)?;
                Self::family_hover(file, service, *family, position)
            })
            .collect();

        match hovers.len() {
            0 => None,
            1 => hovers.pop(),
            _ => {
                let range = hovers.iter().find_map(|h| h.range);
                let contents = hovers.into_iter().flat_map(|h| marked_strings(h.contents));
                Some(Hover {
                    contents: HoverContents::Array(contents.collect()),
                    range,
                })
            }
        }
    }

    /// First hover from one family's documents.
    fn family_hover(
        file: &SourceFile,
        service: &dyn EmbeddedService,
        family: SurfaceFamily,
        position: Position,
    ) -> Option<Hover> {
        let source = file.line_index();
        for doc in file.virtual_documents().family(family) {
            for target in doc.source_to_target(source, point(position), Capabilities::BASIC) {
                let Some(mut hover) = service.hover(doc, target.start) else {
                    continue;
                };
                hover.range = hover
                    .range
                    .and_then(|range| doc.first_source_range(source, range, Capabilities::BASIC));
                return Some(hover);
            }
        }
        None
    }
}

fn marked_strings(contents: HoverContents) -> Vec<MarkedString> {
    match contents {
        HoverContents::Scalar(s) => vec![s],
        HoverContents::Array(v) => v,
        HoverContents::Markup(m) => vec![MarkedString::String(m.value)],
    }
}
