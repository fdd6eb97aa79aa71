//! Style virtual code generation.
//!
//! Preserves style content with 1:1 source mapping for CSS features.

use tessera_carton::lsp_types::Url;
use tessera_relief::SfcStyleBlock;

use crate::generator::verbatim_document;
use crate::{SurfaceKind, VirtualDocument};

/// LSP language id for a style `lang`.
pub fn style_language_id(lang: &str) -> &'static str {
    match lang {
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "styl" | "stylus" => "stylus",
        "postcss" => "postcss",
        _ => "css",
    }
}

/// Generate virtual CSS from the `index`-th style block.
pub fn generate_style_code(
    base: &Url,
    version: i32,
    style: &SfcStyleBlock,
    index: usize,
) -> Option<VirtualDocument> {
    let lang = style.lang();
    let suffix = format!(".__style_{index}.{lang}");
    verbatim_document(
        base,
        &suffix,
        SurfaceKind::Style(index),
        style_language_id(lang),
        version,
        &style.content,
        style.loc.start as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_relief::BlockLocation;

    #[test]
    fn test_style_uri_and_language() {
        let base = Url::parse("file:///app/App.vue").unwrap();
        let style = SfcStyleBlock {
            content: ".a { color: red; }".into(),
            loc: BlockLocation {
                start: 20,
                end: 38,
                tag_start: 0,
                tag_end: 46,
            },
            lang: Some("scss".into()),
            ..Default::default()
        };
        let doc = generate_style_code(&base, 1, &style, 2).unwrap();
        assert_eq!(doc.uri.as_str(), "file:///app/App.vue.__style_2.scss");
        assert_eq!(doc.language_id, "scss");
        assert_eq!(doc.kind, SurfaceKind::Style(2));
    }

    #[test]
    fn test_empty_style_has_no_mappings() {
        let base = Url::parse("file:///app/App.vue").unwrap();
        let style = SfcStyleBlock::default();
        let doc = generate_style_code(&base, 1, &style, 0).unwrap();
        assert!(doc.mappings.is_empty());
        assert_eq!(doc.uri.as_str(), "file:///app/App.vue.__style_0.css");
    }
}
