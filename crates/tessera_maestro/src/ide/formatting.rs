//! Range and document formatting.
//!
//! Formatting runs as a fixed sequence of stages over a scratch copy of the
//! source file. Each stage computes edits against the scratch text, applies
//! them, and re-parses so the next stage sees current offsets:
//!
//! 1. markup and alternate-syntax formatters (whole block)
//! 2. style formatters (whole block)
//! 3. script formatter, through `formatting`-capable mappings only
//! 4. re-indent of multi-line interpolations
//!
//! The requested range follows the scratch text: after each stage its lines
//! move by the line delta of the edits applied above and inside it.
//!
//! The result is one edit replacing the whole document, or nothing when the
//! text did not change.

use lsp_types::{FormattingOptions, Position, Range, TextEdit};
use tessera_carton::{apply_text_edits, LineIndex};
use tessera_mosaic::{Capabilities, SourceFile, SurfaceFamily, VirtualDocument};

use crate::service::{LanguageServices, TextFormatter};

/// Formatting service.
pub struct FormattingService;

impl FormattingService {
    pub fn format_document(
        file: &SourceFile,
        services: &LanguageServices,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        let whole = Range::new(Position::new(0, 0), Position::new(u32::MAX, u32::MAX));
        Self::format_range(file, services, whole, options)
    }

    pub fn format_range(
        file: &SourceFile,
        services: &LanguageServices,
        range: Range,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        let mut scratch = file.clone();
        let mut range = range;

        if let Some(formatter) = services.formatter.as_deref() {
            let edits = block_edits(&scratch, formatter, SurfaceFamily::Markup, options);
            range = apply_stage(&mut scratch, filter_by_lines(edits, range), range);

            let edits = block_edits(&scratch, formatter, SurfaceFamily::Style, options);
            range = apply_stage(&mut scratch, filter_by_lines(edits, range), range);
        }

        if let Some(service) = services.script.as_deref() {
            let mut edits = Vec::new();
            let source = scratch.line_index();
            for doc in scratch.virtual_documents().family(SurfaceFamily::Script) {
                for edit in service.format(doc, options) {
                    for mapped in doc.target_to_source(source, edit.range, Capabilities::FORMATTING) {
                        if contains(range, mapped) {
                            push_edit(&mut edits, TextEdit::new(mapped, edit.new_text.clone()));
                        }
                    }
                }
            }
            range = apply_stage(&mut scratch, edits, range);
        }

        let edits = interpolation_indent_edits(&scratch);
        apply_stage(&mut scratch, filter_by_lines(edits, range), range);

        if scratch.text() == file.text() {
            return None;
        }
        let index = file.line_index();
        Some(vec![TextEdit::new(
            index.span_to_range(0, index.len()),
            scratch.text().to_string(),
        )])
    }
}

/// Apply one stage to the scratch file and return `range` moved onto the
/// new text.
fn apply_stage(scratch: &mut SourceFile, edits: Vec<TextEdit>, range: Range) -> Range {
    if edits.is_empty() {
        return range;
    }
    let text = apply_text_edits(scratch.line_index(), &edits);
    let version = scratch.version();
    scratch.update(version, text);
    track_range(range, &edits)
}

fn track_range(range: Range, edits: &[TextEdit]) -> Range {
    let Range { mut start, mut end } = range;
    for edit in edits {
        let delta = line_delta(edit);
        if edit.range.end.line < range.start.line {
            start.line = shift(start.line, delta);
        }
        if edit.range.end.line < range.end.line {
            end.line = shift(end.line, delta);
        } else if edit.range.end.line == range.end.line {
            // The end column no longer lines up with the edited line.
            end.line = shift(end.line, delta);
            end.character = u32::MAX;
        }
    }
    Range::new(start, end)
}

fn line_delta(edit: &TextEdit) -> i64 {
    let added = edit.new_text.matches('\n').count() as i64;
    let removed = i64::from(edit.range.end.line - edit.range.start.line);
    added - removed
}

fn shift(line: u32, delta: i64) -> u32 {
    if line == u32::MAX {
        return line;
    }
    (i64::from(line) + delta).clamp(0, i64::from(u32::MAX - 1)) as u32
}

/// Whole-block replacements from a text formatter.
fn block_edits(
    file: &SourceFile,
    formatter: &dyn TextFormatter,
    family: SurfaceFamily,
    options: &FormattingOptions,
) -> Vec<TextEdit> {
    let source = file.line_index();
    file.virtual_documents()
        .family(family)
        .filter_map(|doc| {
            let block = block_range(doc)?;
            let formatted = formatter.format(doc.text(), doc.language_id, options)?;
            let new_text = format!("\n{}\n", formatted.trim());
            if new_text == doc.text() {
                return None;
            }
            Some(TextEdit::new(
                source.span_to_range(block.0, block.1),
                new_text,
            ))
        })
        .collect()
}

/// Composite span covered by a verbatim surface.
fn block_range(doc: &VirtualDocument) -> Option<(u32, u32)> {
    let entry = doc.mappings.entries().first()?;
    Some((entry.source.start, entry.source.end))
}

fn filter_by_lines(edits: Vec<TextEdit>, range: Range) -> Vec<TextEdit> {
    edits
        .into_iter()
        .filter(|e| e.range.start.line >= range.start.line && e.range.end.line <= range.end.line)
        .collect()
}

/// Whether `inner` lies entirely within `outer`.
fn contains(outer: Range, inner: Range) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

fn push_edit(edits: &mut Vec<TextEdit>, edit: TextEdit) {
    if !edits.contains(&edit) {
        edits.push(edit);
    }
}

/// Re-indent continuation lines of multi-line interpolations so that they
/// follow the indentation of the line the interpolation starts on.
fn interpolation_indent_edits(file: &SourceFile) -> Vec<TextEdit> {
    let Some(doc) = file.virtual_documents().template.as_ref() else {
        return Vec::new();
    };
    let source = file.line_index();
    let text = file.text();

    let mut edits = Vec::new();
    for entry in doc.mappings.entries() {
        if !entry.capabilities.contains(Capabilities::FORMATTING) {
            continue;
        }
        let (start, end) = (entry.source.start as usize, entry.source.end as usize);
        if !is_interpolation(text, start, end) {
            continue;
        }
        let content = &text[start..end];
        if !content.contains('\n') {
            continue;
        }

        let mut lines: Vec<&str> = content.split('\n').collect();
        let last = lines.last().copied().unwrap_or_default();
        let remove_indent = leading_whitespace(last);
        let base_indent = leading_whitespace(line_prefix(source, entry.source.start));

        let mut reindented: Vec<String> = Vec::with_capacity(lines.len());
        reindented.push(lines.remove(0).to_string());
        for line in lines {
            match line.strip_prefix(remove_indent) {
                Some(rest) => reindented.push(format!("{base_indent}{rest}")),
                None => reindented.push(line.to_string()),
            }
        }
        let new_text = reindented.join("\n");
        if new_text != content {
            edits.push(TextEdit::new(
                source.span_to_range(entry.source.start, entry.source.end),
                new_text,
            ));
        }
    }
    edits
}

fn is_interpolation(text: &str, start: usize, end: usize) -> bool {
    start >= 2
        && text.get(start - 2..start) == Some("{{")
        && text.get(end..end + 2) == Some("}}")
}

/// Text from the start of the line containing `offset` up to `offset`.
fn line_prefix(index: &LineIndex, offset: u32) -> &str {
    let Position { line, .. } = index.offset_to_position(offset);
    let line_start = index.line_start(line).unwrap_or(0);
    index.slice(line_start, offset)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
