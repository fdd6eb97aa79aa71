//! One composite document together with its generated virtual documents.

use tessera_armature::{parse_sfc, SfcError};
use tessera_carton::lsp_types::Url;
use tessera_carton::LineIndex;
use tessera_relief::{ParseError, RootNode, SfcDescriptor};

use crate::{generate_virtual_code, GeneratorOptions, VirtualDocument, VirtualDocuments};

/// A composite document and everything derived from its current text.
///
/// All derived state is rebuilt on every [`update`](Self::update); a
/// source file never mixes generations.
#[derive(Debug, Clone)]
pub struct SourceFile {
    uri: Url,
    version: i32,
    index: LineIndex,
    descriptor: SfcDescriptor,
    sfc_errors: Vec<SfcError>,
    template_ast: Option<RootNode>,
    template_errors: Vec<ParseError>,
    documents: VirtualDocuments,
    options: GeneratorOptions,
}

impl SourceFile {
    pub fn new(uri: Url, version: i32, text: impl Into<String>, options: GeneratorOptions) -> Self {
        let mut file = Self {
            uri,
            version,
            index: LineIndex::new(String::new()),
            descriptor: SfcDescriptor::default(),
            sfc_errors: Vec::new(),
            template_ast: None,
            template_errors: Vec::new(),
            documents: VirtualDocuments::new(),
            options,
        };
        file.regenerate(text.into());
        file
    }

    /// Replace the text and regenerate every virtual document.
    pub fn update(&mut self, version: i32, text: impl Into<String>) {
        self.version = version;
        self.regenerate(text.into());
    }

    fn regenerate(&mut self, text: String) {
        let (descriptor, sfc_errors) = parse_sfc(&text);
        let generated = generate_virtual_code(&self.uri, self.version, &descriptor, &self.options);
        tracing::trace!(
            uri = %self.uri,
            version = self.version,
            documents = generated.documents.len(),
            "regenerated virtual code"
        );

        self.index = LineIndex::new(text);
        self.descriptor = descriptor;
        self.sfc_errors = sfc_errors;
        self.template_ast = generated.template_ast;
        self.template_errors = generated.template_errors;
        self.documents = generated.documents;
    }

    #[inline]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    #[inline]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[inline]
    pub fn text(&self) -> &str {
        self.index.text()
    }

    #[inline]
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn descriptor(&self) -> &SfcDescriptor {
        &self.descriptor
    }

    /// Block-level problems (duplicate blocks).
    pub fn sfc_errors(&self) -> &[SfcError] {
        &self.sfc_errors
    }

    pub fn template_ast(&self) -> Option<&RootNode> {
        self.template_ast.as_ref()
    }

    pub fn template_errors(&self) -> &[ParseError] {
        &self.template_errors
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn virtual_documents(&self) -> &VirtualDocuments {
        &self.documents
    }

    pub fn find_virtual(&self, uri: &Url) -> Option<&VirtualDocument> {
        self.documents.find(uri)
    }
}
