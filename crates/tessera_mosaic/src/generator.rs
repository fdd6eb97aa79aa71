//! Virtual code generator that transforms a composite document into
//! virtual documents.

use std::fmt;
use std::sync::Arc;

use tessera_armature::parse_template;
use tessera_carton::lsp_types::Url;
use tessera_carton::LineIndex;
use tessera_relief::{ParseError, RootNode, SfcDescriptor, SfcTemplateBlock};

use crate::alt_syntax::{AltSyntaxRenderer, OccurrenceMapper};
use crate::template_code::{generate_template_code, Fragment, GenContext, TEMPLATE_PREAMBLE};
use crate::{
    generate_markup_code, generate_script_code, generate_style_code, virtual_uri, MappingEntry,
    MappingTable, SourceRange, SurfaceKind, VirtualDocument, VirtualDocuments,
};

/// Generation settings shared by every source file of a project.
#[derive(Clone, Default)]
pub struct GeneratorOptions {
    /// Renders alternate-syntax templates to markup. Without one, such
    /// templates get no template script surface.
    pub alt_syntax: Option<Arc<dyn AltSyntaxRenderer>>,
}

impl fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("alt_syntax", &self.alt_syntax.as_ref().map(|r| r.lang().to_owned()))
            .finish()
    }
}

/// Everything generated for one version of a composite document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedCode {
    pub documents: VirtualDocuments,
    /// Parsed template (rendered markup for alternate syntax)
    pub template_ast: Option<RootNode>,
    pub template_errors: Vec<ParseError>,
}

/// Generate every virtual document for `descriptor`.
pub fn generate_virtual_code(
    uri: &Url,
    version: i32,
    descriptor: &SfcDescriptor,
    options: &GeneratorOptions,
) -> GeneratedCode {
    let mut generated = GeneratedCode::default();
    let docs = &mut generated.documents;

    if let Some(script) = &descriptor.script {
        docs.script = generate_script_code(uri, version, script);
    }
    if let Some(script_setup) = &descriptor.script_setup {
        docs.script_setup = generate_script_code(uri, version, script_setup);
    }

    if let Some(template) = &descriptor.template {
        docs.markup = generate_markup_code(uri, version, template);
        if let Some((ast, errors, doc)) = generate_template_script(uri, version, template, options) {
            docs.template = doc;
            generated.template_ast = Some(ast);
            generated.template_errors = errors;
        }
    }

    for (i, style) in descriptor.styles.iter().enumerate() {
        if let Some(doc) = generate_style_code(uri, version, style, i) {
            docs.styles.push(doc);
        }
    }

    generated
}

fn generate_template_script(
    uri: &Url,
    version: i32,
    template: &SfcTemplateBlock,
    options: &GeneratorOptions,
) -> Option<(RootNode, Vec<ParseError>, Option<VirtualDocument>)> {
    let block_offset = template.loc.start as u32;
    let lang = template.lang();

    if lang == "html" {
        let (ast, errors) = parse_template(&template.content);
        let ctx = GenContext {
            block_offset,
            mapper: None,
        };
        let doc = template_script_document(uri, version, &ast, ctx);
        return Some((ast, errors, doc));
    }

    let Some(renderer) = options.alt_syntax.as_ref().filter(|r| r.lang() == lang) else {
        tracing::debug!(lang, "no renderer for template language");
        return None;
    };
    let Some(html) = renderer.render(&template.content) else {
        tracing::debug!(lang, "template did not render");
        return None;
    };
    let (ast, errors) = parse_template(&html);
    let mapper = OccurrenceMapper::new(&template.content, &html);
    let ctx = GenContext {
        block_offset,
        mapper: Some(&mapper),
    };
    let doc = template_script_document(uri, version, &ast, ctx);
    Some((ast, errors, doc))
}

fn template_script_document(
    uri: &Url,
    version: i32,
    ast: &RootNode,
    ctx: GenContext<'_>,
) -> Option<VirtualDocument> {
    let mut code = Fragment::new();
    code.push_str(TEMPLATE_PREAMBLE);
    code.append(generate_template_code(ast, ctx));
    let (text, mappings) = code.into_parts();

    Some(VirtualDocument {
        uri: virtual_uri(uri, ".__template.ts")?,
        kind: SurfaceKind::TemplateScript,
        language_id: "typescript",
        version,
        index: LineIndex::new(text),
        mappings: MappingTable::from_entries(mappings),
    })
}

/// A block copied as is, mapped 1:1 with every capability.
pub(crate) fn verbatim_document(
    base: &Url,
    suffix: &str,
    kind: SurfaceKind,
    language_id: &'static str,
    version: i32,
    content: &str,
    block_offset: u32,
) -> Option<VirtualDocument> {
    let len = content.len() as u32;
    let mut mappings = MappingTable::new();
    if len > 0 {
        mappings.push(MappingEntry::verbatim(
            SourceRange::new(block_offset, block_offset + len),
            SourceRange::new(0, len),
        ));
    }
    Some(VirtualDocument {
        uri: virtual_uri(base, suffix)?,
        kind,
        language_id,
        version,
        index: LineIndex::new(content),
        mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_armature::parse_sfc;

    struct UpperRenderer;

    // Renders `p {{ x }}` lines as `<p>{{ x }}</p>`
    impl AltSyntaxRenderer for UpperRenderer {
        fn lang(&self) -> &str {
            "pug"
        }

        fn render(&self, source: &str) -> Option<String> {
            let mut html = String::new();
            for line in source.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let (tag, rest) = line.split_once(' ').unwrap_or((line, ""));
                html.push_str(&format!("<{tag}>{rest}</{tag}>"));
            }
            Some(html)
        }
    }

    fn uri() -> Url {
        Url::parse("file:///app/App.vue").unwrap()
    }

    #[test]
    fn test_generates_every_surface() {
        let source = "<template><p>{{ a }}</p></template>\n<script>export default {}</script>\n<script setup lang=\"ts\">const a = 1</script>\n<style>p{}</style>\n<style lang=\"less\">i{}</style>";
        let (descriptor, _) = parse_sfc(source);
        let generated = generate_virtual_code(&uri(), 1, &descriptor, &GeneratorOptions::default());

        let uris: Vec<_> = generated.documents.iter().map(|d| d.uri.to_string()).collect();
        assert_eq!(
            uris,
            vec![
                "file:///app/App.vue.__script.js",
                "file:///app/App.vue.__script_setup.ts",
                "file:///app/App.vue.__template.ts",
                "file:///app/App.vue.__template.html",
                "file:///app/App.vue.__style_0.css",
                "file:///app/App.vue.__style_1.less",
            ]
        );
        let template = generated.documents.template.as_ref().unwrap();
        assert!(template.text().starts_with(TEMPLATE_PREAMBLE));

        // The interpolation maps back into the composite document
        let entry = template.mappings.entries()[0];
        assert_eq!(&source[entry.source.start as usize..entry.source.end as usize], " a ");
    }

    #[test]
    fn test_alt_syntax_maps_into_pug_text() {
        let source = "<template lang=\"pug\">\np {{ msg }}\n</template>";
        let (descriptor, _) = parse_sfc(source);
        let options = GeneratorOptions {
            alt_syntax: Some(Arc::new(UpperRenderer)),
        };
        let generated = generate_virtual_code(&uri(), 1, &descriptor, &options);

        let markup = generated.documents.markup.as_ref().unwrap();
        assert_eq!(markup.kind, SurfaceKind::AltMarkup);
        assert_eq!(markup.uri.as_str(), "file:///app/App.vue.__template.pug");

        let template = generated.documents.template.as_ref().unwrap();
        let entry = template.mappings.entries()[0];
        assert_eq!(&source[entry.source.start as usize..entry.source.end as usize], " msg ");
    }

    #[test]
    fn test_alt_syntax_without_renderer() {
        let source = "<template lang=\"pug\">\np hi\n</template>";
        let (descriptor, _) = parse_sfc(source);
        let generated = generate_virtual_code(&uri(), 1, &descriptor, &GeneratorOptions::default());
        assert!(generated.documents.template.is_none());
        assert!(generated.documents.markup.is_some());
    }
}
