//! End-to-end tests: composite document in, virtual documents and
//! position translation out.

use tessera_carton::lsp_types::{Position, Range, Url};
use tessera_mosaic::{Capabilities, GeneratorOptions, SourceFile, SourceFiles, SurfaceKind};

const APP: &str = r#"<script setup lang="ts">
import { ref } from 'vue'
const msg = ref('hello')
const items = ref([1, 2, 3])
</script>

<template>
  <div class="app">
    <h1>{{ msg }}</h1>
    <ul>
      <li v-for="item in items" :key="item">{{ item }}</li>
    </ul>
  </div>
</template>

<style scoped>
.app { color: red; }
</style>
"#;

fn app() -> SourceFile {
    SourceFile::new(
        Url::parse("file:///project/src/App.vue").unwrap(),
        1,
        APP,
        GeneratorOptions::default(),
    )
}

/// LSP range of the `nth` occurrence of `needle` in `text`.
fn range_of(text: &str, needle: &str, nth: usize) -> Range {
    let offset = text
        .match_indices(needle)
        .nth(nth)
        .map(|(i, _)| i)
        .unwrap();
    let index = tessera_carton::LineIndex::new(text);
    index.span_to_range(offset as u32, (offset + needle.len()) as u32)
}

fn slice(text: &str, range: Range) -> &str {
    let index = tessera_carton::LineIndex::new(text);
    let (start, end) = index.range_to_span(range).unwrap();
    &text[start as usize..end as usize]
}

#[test]
fn surfaces_of_a_full_document() {
    let file = app();
    let docs = file.virtual_documents();
    let kinds: Vec<_> = docs.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SurfaceKind::ScriptSetup,
            SurfaceKind::TemplateScript,
            SurfaceKind::Markup,
            SurfaceKind::Style(0),
        ]
    );
    let languages: Vec<_> = docs.iter().map(|d| d.language_id).collect();
    assert_eq!(languages, vec!["typescript", "typescript", "html", "css"]);
}

#[test]
fn interpolation_round_trips_through_template_script() {
    let file = app();
    let template = file.virtual_documents().template.as_ref().unwrap();

    let source_range = range_of(APP, "msg", 1);
    let targets = template.source_to_target(file.line_index(), source_range, Capabilities::BASIC);
    assert_eq!(targets.len(), 1);
    assert_eq!(slice(template.text(), targets[0]), "msg");

    let back = template
        .first_source_range(file.line_index(), targets[0], Capabilities::BASIC)
        .unwrap();
    assert_eq!(back, source_range);
}

#[test]
fn script_setup_maps_verbatim() {
    let file = app();
    let script = file.virtual_documents().script_setup.as_ref().unwrap();

    let source_range = range_of(APP, "items", 0);
    let targets = script.source_to_target(file.line_index(), source_range, Capabilities::REFERENCES);
    assert_eq!(targets.len(), 1);
    assert_eq!(slice(script.text(), targets[0]), "items");
    assert_eq!(targets[0].start, Position::new(3, 6));
}

#[test]
fn for_alias_declaration_maps_to_its_binding() {
    let file = app();
    let template = file.virtual_documents().template.as_ref().unwrap();

    // The script engine would answer "definition of item" with the
    // generated declaration
    let declaration = range_of(template.text(), "const item", 0);
    let name = Range::new(
        Position::new(declaration.start.line, declaration.start.character + 6),
        declaration.end,
    );
    let back = template
        .first_source_range(file.line_index(), name, Capabilities::REFERENCES)
        .unwrap();
    let alias = range_of(APP, "item in items", 0);
    assert_eq!(back, Range::new(alias.start, Position::new(alias.start.line, alias.start.character + 4)));
}

#[test]
fn style_maps_verbatim() {
    let file = app();
    let style = &file.virtual_documents().styles[0];
    assert_eq!(style.text(), "\n.app { color: red; }\n");

    let targets = style.source_to_target(
        file.line_index(),
        range_of(APP, "red", 0),
        Capabilities::FORMATTING,
    );
    assert_eq!(targets, vec![Range::new(Position::new(1, 14), Position::new(1, 17))]);
}

#[test]
fn unmapped_positions_translate_to_nothing() {
    let file = app();
    let template = file.virtual_documents().template.as_ref().unwrap();
    // Inside the `<ul>` tag name
    let range = range_of(APP, "<ul>", 0);
    assert!(template
        .source_to_target(file.line_index(), range, Capabilities::BASIC)
        .is_empty());
}

#[test]
fn regeneration_is_deterministic() {
    let a = app();
    let b = app();
    assert_eq!(a.virtual_documents(), b.virtual_documents());

    let mut c = app();
    c.update(2, APP);
    for (x, y) in a.virtual_documents().iter().zip(c.virtual_documents().iter()) {
        assert_eq!(x.text(), y.text());
        assert_eq!(x.mappings, y.mappings);
        assert_eq!(y.version, 2);
    }
}

#[test]
fn registry_resolves_virtual_uris() {
    let mut files = SourceFiles::new();
    files.insert(app());
    let uri = Url::parse("file:///project/src/App.vue.__style_0.css").unwrap();
    let (owner, doc) = files.find_by_virtual_uri(&uri).unwrap();
    assert_eq!(owner.version(), 1);
    assert_eq!(doc.kind, SurfaceKind::Style(0));
}
