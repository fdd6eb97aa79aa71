//! Script virtual code generation.
//!
//! `<script>` and `<script setup>` content is copied verbatim with a single
//! mapping over the whole block.

use std::path::Path;

use tessera_carton::lsp_types::Url;
use tessera_carton::LineIndex;
use tessera_relief::SfcScriptBlock;

use crate::generator::verbatim_document;
use crate::{MappingEntry, MappingTable, SourceRange, SurfaceKind, VirtualDocument};

/// File extension and LSP language id for a script `lang`.
pub fn script_language(lang: &str) -> (&'static str, &'static str) {
    match lang {
        "ts" | "typescript" => ("ts", "typescript"),
        "tsx" => ("tsx", "typescriptreact"),
        "jsx" => ("jsx", "javascriptreact"),
        _ => ("js", "javascript"),
    }
}

/// Generate the virtual document for a script block.
pub fn generate_script_code(
    base: &Url,
    version: i32,
    block: &SfcScriptBlock,
) -> Option<VirtualDocument> {
    let (ext, language_id) = script_language(block.lang());
    let (kind, name) = if block.setup {
        (SurfaceKind::ScriptSetup, "__script_setup")
    } else {
        (SurfaceKind::Script, "__script")
    };
    let suffix = format!(".{name}.{ext}");
    verbatim_document(
        base,
        &suffix,
        kind,
        language_id,
        version,
        &block.content,
        block.loc.start as u32,
    )
}

/// A plain script file as a surface of itself, under its own URI.
pub fn plain_script_document(uri: Url, version: i32, text: &str) -> VirtualDocument {
    let ext = Path::new(uri.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let (_, language_id) = script_language(ext);
    let len = text.len() as u32;
    let mut mappings = MappingTable::new();
    if len > 0 {
        mappings.push(MappingEntry::verbatim(
            SourceRange::new(0, len),
            SourceRange::new(0, len),
        ));
    }
    VirtualDocument {
        uri,
        kind: SurfaceKind::Script,
        language_id,
        version,
        index: LineIndex::new(text),
        mappings,
    }
}
