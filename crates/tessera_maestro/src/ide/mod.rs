//! Feature dispatch over virtual documents.
//!
//! Every feature follows the same shape:
//! - map the request range into each relevant virtual document, keeping
//!   only entries with the feature's capability
//! - ask the matching embedded service
//! - map each answer back through the same table
//! - merge (first match, de-duplicated union, or one combined edit)
//!
//! A surface without an overlapping entry contributes nothing.

pub mod color;
pub mod definition;
pub mod diagnostics;
pub mod formatting;
pub mod hover;
pub mod references;
pub mod rename;

pub use color::ColorService;
pub use definition::DefinitionService;
pub use diagnostics::DiagnosticService;
pub use formatting::FormattingService;
pub use hover::HoverService;
pub use references::ReferencesService;
pub use rename::RenameService;

use lsp_types::{Location, Position, Range};
use tessera_mosaic::{Capabilities, SourceFiles};

/// Empty range at `position`.
#[inline]
pub(crate) fn point(position: Position) -> Range {
    Range::new(position, position)
}

/// Translate a location reported by a service into composite-document
/// locations. Locations outside any virtual document pass through.
pub(crate) fn map_location(
    files: &SourceFiles,
    location: Location,
    required: Capabilities,
) -> Vec<Location> {
    let Some((owner, doc)) = files.find_by_virtual_uri(&location.uri) else {
        return vec![location];
    };
    doc.target_to_source(owner.line_index(), location.range, required)
        .into_iter()
        .map(|range| Location::new(owner.uri().clone(), range))
        .collect()
}

/// Append `items` to `out`, skipping ones already present.
pub(crate) fn extend_unique<T: PartialEq>(out: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
}
