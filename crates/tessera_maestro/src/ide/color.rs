//! Color presentations for style surfaces.

use lsp_types::{Color, ColorPresentation, Range, TextEdit};
use tessera_carton::LineIndex;
use tessera_mosaic::{Capabilities, SourceFile, SurfaceFamily, VirtualDocument};

use crate::service::LanguageServices;

/// Color presentation service.
pub struct ColorService;

impl ColorService {
    /// Presentations for `color` at `range`, with every edit translated
    /// through its own range. Edits that land outside the composite
    /// document are dropped.
    pub fn color_presentations(
        file: &SourceFile,
        services: &LanguageServices,
        color: Color,
        range: Range,
    ) -> Vec<ColorPresentation> {
        let Some(service) = services.for_family(SurfaceFamily::Style) else {
            return Vec::new();
        };
        let source = file.line_index();
        let mut result = Vec::new();
        for doc in file.virtual_documents().family(SurfaceFamily::Style) {
            for target in doc.source_to_target(source, range, Capabilities::BASIC) {
                let presentations = service.color_presentations(doc, color, target);
                result.extend(
                    presentations
                        .into_iter()
                        .map(|item| map_presentation(doc, source, item)),
                );
            }
        }
        result
    }
}

fn map_presentation(
    doc: &VirtualDocument,
    source: &LineIndex,
    mut item: ColorPresentation,
) -> ColorPresentation {
    let map_edit = |edit: TextEdit| {
        let range = doc.first_source_range(source, edit.range, Capabilities::BASIC)?;
        Some(TextEdit::new(range, edit.new_text))
    };
    item.text_edit = item.text_edit.and_then(map_edit);
    item.additional_text_edits = item
        .additional_text_edits
        .map(|edits| edits.into_iter().filter_map(map_edit).collect());
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::test_utils::{range_of, source_file};
    use crate::service::EmbeddedService;
    use lsp_types::Position;
    use std::sync::Arc;

    /// Offers `rgb(...)` replacing the range plus an edit on the first line.
    struct CssEngine;

    impl EmbeddedService for CssEngine {
        fn color_presentations(
            &self,
            _doc: &VirtualDocument,
            _color: Color,
            range: Range,
        ) -> Vec<ColorPresentation> {
            vec![ColorPresentation {
                label: "rgb(255, 0, 0)".into(),
                text_edit: Some(TextEdit::new(range, "rgb(255, 0, 0)".into())),
                additional_text_edits: Some(vec![TextEdit::new(
                    Range::new(Position::new(1, 0), Position::new(1, 1)),
                    "/* c */".into(),
                )]),
            }]
        }
    }

    fn red() -> Color {
        Color {
            red: 1.0,
            green: 0.0,
            blue: 0.0,
            alpha: 1.0,
        }
    }

    #[test]
    fn test_each_edit_maps_through_its_own_range() {
        let text = "<template><p/></template>\n<style>\n.a { color: red }\n</style>";
        let file = source_file(text);
        let services = LanguageServices {
            style: Some(Arc::new(CssEngine)),
            ..Default::default()
        };

        let red_range = range_of(text, "red", 0);
        let result = ColorService::color_presentations(&file, &services, red(), red_range);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text_edit.as_ref().unwrap().range, red_range);

        // Virtual line 1 column 0 is the `.` of `.a`
        let additional = result[0].additional_text_edits.as_ref().unwrap();
        let dot = range_of(text, ".a", 0).start;
        assert_eq!(
            additional[0].range,
            Range::new(dot, Position::new(dot.line, dot.character + 1))
        );
    }

    #[test]
    fn test_outside_style_yields_nothing() {
        let text = "<template><p/></template>\n<style>.a{}</style>";
        let file = source_file(text);
        let services = LanguageServices {
            style: Some(Arc::new(CssEngine)),
            ..Default::default()
        };
        let range = range_of(text, "<p/>", 0);
        assert!(ColorService::color_presentations(&file, &services, red(), range).is_empty());
    }
}
