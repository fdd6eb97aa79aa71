//! Applying protocol text edits to plain strings.

use lsp_types::TextEdit;

use crate::LineIndex;

/// Apply `edits` (expressed against `index`'s text) and return the new text.
///
/// Edits are applied back to front so earlier offsets stay valid. Edits
/// whose range does not resolve against the text are skipped, and an edit
/// that overlaps one already applied is dropped.
pub fn apply_text_edits(index: &LineIndex, edits: &[TextEdit]) -> String {
    let mut spans: Vec<(u32, u32, &str)> = edits
        .iter()
        .filter_map(|edit| {
            let (start, end) = index.range_to_span(edit.range)?;
            Some((start, end, edit.new_text.as_str()))
        })
        .collect();
    // Stable: edits at the same start keep their relative order.
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    let mut text = index.text().to_string();
    let mut floor = u32::MAX;
    for (start, end, new_text) in spans {
        if end > floor {
            continue;
        }
        text.replace_range(start as usize..end as usize, new_text);
        floor = start;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Position, Range};

    fn edit(sl: u32, sc: u32, el: u32, ec: u32, text: &str) -> TextEdit {
        TextEdit {
            range: Range::new(Position::new(sl, sc), Position::new(el, ec)),
            new_text: text.to_string(),
        }
    }

    #[test]
    fn test_apply_multiple_edits() {
        let index = LineIndex::new("let a=1\nlet b=2");
        let result = apply_text_edits(
            &index,
            &[edit(0, 5, 0, 6, " = "), edit(1, 5, 1, 6, " = ")],
        );
        assert_eq!(result, "let a = 1\nlet b = 2");
    }

    #[test]
    fn test_overlapping_edit_is_dropped() {
        let index = LineIndex::new("abcdef");
        let result = apply_text_edits(&index, &[edit(0, 1, 0, 4, "X"), edit(0, 2, 0, 5, "Y")]);
        assert_eq!(result, "abYf");
    }

    #[test]
    fn test_invalid_range_is_skipped() {
        let index = LineIndex::new("abc");
        let result = apply_text_edits(&index, &[edit(5, 0, 5, 1, "X")]);
        assert_eq!(result, "abc");
    }
}
