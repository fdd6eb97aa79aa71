//! Mosaic - the virtual code layer of tessera.
//!
//! A composite document is cut into single-language virtual documents,
//! each paired with a [`MappingTable`] back to the original text.
//!
//! ## Architecture
//!
//! ```text
//! .vue SFC File
//!     │
//!     ▼
//! ┌─────────────────────────────────────┐
//! │ SourceFile                          │
//! │ (parse → VirtualCodeGenerator)      │
//! └─────────────────────────────────────┘
//!     │
//!     ├─► Script Virtual (.vue.__script.ts / .vue.__script_setup.ts)
//!     │   - Block content verbatim
//!     │
//!     ├─► Template Script Virtual (.vue.__template.ts)
//!     │   - Template expressions as type-checkable statements
//!     │
//!     ├─► Markup Virtual (.vue.__template.html / .vue.__template.pug)
//!     │   - Template content verbatim
//!     │
//!     └─► Style Virtual (.vue.__style_N.css)
//!         - One per <style> block
//! ```

mod alt_syntax;
mod generator;
mod markup_code;
mod registry;
mod script_code;
mod source_file;
mod source_map;
mod style_code;
mod template_code;

pub use alt_syntax::*;
pub use generator::*;
pub use markup_code::*;
pub use registry::*;
pub use script_code::*;
pub use source_file::*;
pub use source_map::*;
pub use style_code::*;
pub use template_code::*;

use tessera_carton::lsp_types::{Range, Url};
use tessera_carton::LineIndex;

/// What a virtual document was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// `<script>` content
    Script,
    /// `<script setup>` content
    ScriptSetup,
    /// Template transformed into script statements
    TemplateScript,
    /// Template content as markup
    Markup,
    /// Template content in an alternate syntax
    AltMarkup,
    /// One `<style>` block
    Style(usize),
}

/// Which external engine analyzes a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFamily {
    Script,
    Markup,
    Style,
}

impl SurfaceKind {
    pub fn family(&self) -> SurfaceFamily {
        match self {
            Self::Script | Self::ScriptSetup | Self::TemplateScript => SurfaceFamily::Script,
            Self::Markup | Self::AltMarkup => SurfaceFamily::Markup,
            Self::Style(_) => SurfaceFamily::Style,
        }
    }
}

/// A virtual document generated from a composite document.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDocument {
    /// Virtual document URI (e.g., "file.vue.__template.ts")
    pub uri: Url,
    pub kind: SurfaceKind,
    /// LSP language id (`typescript`, `html`, `scss`, ...)
    pub language_id: &'static str,
    /// Same as the owning composite document's version
    pub version: i32,
    /// Generated content
    pub index: LineIndex,
    /// Composite → virtual mappings
    pub mappings: MappingTable,
}

impl VirtualDocument {
    #[inline]
    pub fn text(&self) -> &str {
        self.index.text()
    }

    /// Composite-document range to every matching virtual range.
    pub fn source_to_target(
        &self,
        source: &LineIndex,
        range: Range,
        required: Capabilities,
    ) -> Vec<Range> {
        let Some((start, end)) = source.range_to_span(range) else {
            return Vec::new();
        };
        self.mappings
            .forward_for(SourceRange::new(start, end), required)
            .iter()
            .map(|hit| self.index.span_to_range(hit.range.start, hit.range.end))
            .collect()
    }

    /// Virtual range to every matching composite-document range.
    pub fn target_to_source(
        &self,
        source: &LineIndex,
        range: Range,
        required: Capabilities,
    ) -> Vec<Range> {
        let Some((start, end)) = self.index.range_to_span(range) else {
            return Vec::new();
        };
        self.mappings
            .reverse_for(SourceRange::new(start, end), required)
            .iter()
            .map(|hit| source.span_to_range(hit.range.start, hit.range.end))
            .collect()
    }

    /// First composite range for a virtual range.
    pub fn first_source_range(
        &self,
        source: &LineIndex,
        range: Range,
        required: Capabilities,
    ) -> Option<Range> {
        let (start, end) = self.index.range_to_span(range)?;
        self.mappings
            .first_reverse(SourceRange::new(start, end), required)
            .map(|r| source.span_to_range(r.start, r.end))
    }
}

/// Collection of virtual documents for a composite document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualDocuments {
    pub script: Option<VirtualDocument>,
    pub script_setup: Option<VirtualDocument>,
    /// Template transformed into script statements
    pub template: Option<VirtualDocument>,
    /// Template content (markup or alternate syntax)
    pub markup: Option<VirtualDocument>,
    /// One per `<style>` block
    pub styles: Vec<VirtualDocument>,
}

impl VirtualDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document, scripts first.
    pub fn iter(&self) -> impl Iterator<Item = &VirtualDocument> {
        self.script
            .iter()
            .chain(self.script_setup.iter())
            .chain(self.template.iter())
            .chain(self.markup.iter())
            .chain(self.styles.iter())
    }

    /// Documents analyzed by one engine family.
    pub fn family(&self, family: SurfaceFamily) -> impl Iterator<Item = &VirtualDocument> {
        self.iter().filter(move |doc| doc.kind.family() == family)
    }

    /// Find a document by URI.
    pub fn find(&self, uri: &Url) -> Option<&VirtualDocument> {
        self.iter().find(|doc| &doc.uri == uri)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Byte range in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRange {
    /// Start byte offset
    pub start: u32,
    /// End byte offset
    pub end: u32,
}

impl SourceRange {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Range of `len` bytes starting at `start`.
    #[inline]
    pub const fn at(start: u32, len: usize) -> Self {
        Self {
            start,
            end: start + len as u32,
        }
    }

    /// Check if this range contains the given offset.
    #[inline]
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Whether `other` lies entirely inside this range.
    #[inline]
    pub fn contains_range(&self, other: SourceRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Move the range `by` bytes forward.
    #[inline]
    pub const fn shift(self, by: u32) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

impl From<&tessera_relief::SourceLocation> for SourceRange {
    fn from(loc: &tessera_relief::SourceLocation) -> Self {
        Self {
            start: loc.start.offset,
            end: loc.end.offset,
        }
    }
}

/// Append `suffix` to a document URI.
pub(crate) fn virtual_uri(base: &Url, suffix: &str) -> Option<Url> {
    let mut uri = String::with_capacity(base.as_str().len() + suffix.len());
    uri.push_str(base.as_str());
    uri.push_str(suffix);
    Url::parse(&uri).ok()
}
