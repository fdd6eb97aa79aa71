//! Markup virtual code generation.
//!
//! The template content itself, verbatim, for the markup engine: as HTML,
//! or as its alternate syntax when the template declares one.

use tessera_carton::lsp_types::Url;
use tessera_relief::SfcTemplateBlock;

use crate::generator::verbatim_document;
use crate::{SurfaceKind, VirtualDocument};

/// Generate the markup document for a template block.
pub fn generate_markup_code(
    base: &Url,
    version: i32,
    template: &SfcTemplateBlock,
) -> Option<VirtualDocument> {
    let (suffix, kind, language_id) = match template.lang() {
        "html" => (".__template.html", SurfaceKind::Markup, "html"),
        "pug" => (".__template.pug", SurfaceKind::AltMarkup, "jade"),
        _ => return None,
    };
    verbatim_document(
        base,
        suffix,
        kind,
        language_id,
        version,
        &template.content,
        template.loc.start as u32,
    )
}
