//! Interfaces to the external language services.
//!
//! Every service sees one virtual document at a time and answers in that
//! document's coordinates; translation back to the composite document is
//! the dispatcher's job.

use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{
    Color, ColorPresentation, Diagnostic, FormattingOptions, Hover, Location, Position, Range,
    TextEdit, WorkspaceEdit,
};
use tessera_mosaic::{AltSyntaxRenderer, GeneratorOptions, SurfaceFamily, VirtualDocument};

/// An analysis engine for one embedded language.
///
/// All methods default to "no result" so an engine only implements what it
/// supports.
#[async_trait]
pub trait EmbeddedService: Send + Sync {
    fn hover(&self, _doc: &VirtualDocument, _position: Position) -> Option<Hover> {
        None
    }

    /// Whole-document formatting edits.
    fn format(&self, _doc: &VirtualDocument, _options: &FormattingOptions) -> Vec<TextEdit> {
        Vec::new()
    }

    fn color_presentations(
        &self,
        _doc: &VirtualDocument,
        _color: Color,
        _range: Range,
    ) -> Vec<ColorPresentation> {
        Vec::new()
    }

    /// Locations may point into any document, virtual or not.
    fn definition(&self, _doc: &VirtualDocument, _position: Position) -> Vec<Location> {
        Vec::new()
    }

    fn references(&self, _doc: &VirtualDocument, _position: Position) -> Vec<Location> {
        Vec::new()
    }

    fn rename(
        &self,
        _doc: &VirtualDocument,
        _position: Position,
        _new_name: &str,
    ) -> Option<WorkspaceEdit> {
        None
    }

    /// Diagnose the document. This is the only suspension point of a
    /// validation pass.
    async fn validate(&self, _doc: &VirtualDocument) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// A whole-text formatter for a markup, alternate-syntax or style language.
pub trait TextFormatter: Send + Sync {
    /// Formatted text, or `None` when `language_id` is not supported or the
    /// text does not format.
    fn format(&self, text: &str, language_id: &str, options: &FormattingOptions)
        -> Option<String>;
}

/// The set of services a project dispatches to.
#[derive(Clone, Default)]
pub struct LanguageServices {
    pub script: Option<Arc<dyn EmbeddedService>>,
    pub markup: Option<Arc<dyn EmbeddedService>>,
    pub style: Option<Arc<dyn EmbeddedService>>,
    pub formatter: Option<Arc<dyn TextFormatter>>,
    /// Renders alternate-syntax templates for the template script surface
    pub alt_syntax: Option<Arc<dyn AltSyntaxRenderer>>,
}

impl LanguageServices {
    /// Service analyzing one surface family.
    pub fn for_family(&self, family: SurfaceFamily) -> Option<&dyn EmbeddedService> {
        let service = match family {
            SurfaceFamily::Script => &self.script,
            SurfaceFamily::Markup => &self.markup,
            SurfaceFamily::Style => &self.style,
        };
        service.as_deref()
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            alt_syntax: self.alt_syntax.clone(),
        }
    }
}

impl std::fmt::Debug for LanguageServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageServices")
            .field("script", &self.script.is_some())
            .field("markup", &self.markup.is_some())
            .field("style", &self.style.is_some())
            .field("formatter", &self.formatter.is_some())
            .field("alt_syntax", &self.alt_syntax.is_some())
            .finish()
    }
}
