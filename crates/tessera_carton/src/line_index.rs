//! Line index for byte offset <-> LSP position conversion.
//!
//! LSP positions count columns in UTF-16 code units while every range in
//! the tessera tree is a byte offset, so each document and each virtual
//! document carries one of these.

use lsp_types::{Position, Range};

/// Pre-computed line starts plus the text they index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<u32>,
    /// Indexed text.
    text: String,
}

impl LineIndex {
    /// Build a line index for the given text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts, text }
    }

    /// The indexed text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text length in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines (a trailing newline opens a final empty line).
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of `line`.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }

    /// End of `line`, excluding its line break.
    fn line_end(&self, line: usize) -> u32 {
        match self.line_starts.get(line + 1) {
            Some(&next) => {
                let mut end = next.saturating_sub(1);
                if end > 0 && self.text.as_bytes().get(end as usize - 1) == Some(&b'\r') {
                    end -= 1;
                }
                end
            }
            None => self.len(),
        }
    }

    /// Convert a byte offset to an LSP position. Offsets past the end clamp
    /// to the end of the text.
    pub fn offset_to_position(&self, offset: u32) -> Position {
        let offset = offset.min(self.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts[line] as usize;
        let mut character = 0u32;
        for (i, c) in self.text[line_start..].char_indices() {
            if line_start + i >= offset as usize || c == '\n' {
                break;
            }
            character += c.len_utf16() as u32;
        }
        Position::new(line as u32, character)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Characters past the end of the line clamp to the line end; lines
    /// past the end of the text yield `None`.
    pub fn position_to_offset(&self, position: Position) -> Option<u32> {
        let line = position.line as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self.line_end(line);
        let slice = &self.text[line_start as usize..line_end as usize];

        let mut utf16 = 0u32;
        for (i, c) in slice.char_indices() {
            if utf16 >= position.character {
                return Some(line_start + i as u32);
            }
            utf16 += c.len_utf16() as u32;
        }
        Some(line_end)
    }

    /// Convert a byte span to an LSP range.
    pub fn span_to_range(&self, start: u32, end: u32) -> Range {
        Range::new(self.offset_to_position(start), self.offset_to_position(end))
    }

    /// Convert an LSP range to a byte span.
    pub fn range_to_span(&self, range: Range) -> Option<(u32, u32)> {
        let start = self.position_to_offset(range.start)?;
        let end = self.position_to_offset(range.end)?;
        Some((start.min(end), end.max(start)))
    }

    /// Slice the text between two byte offsets (clamped).
    pub fn slice(&self, start: u32, end: u32) -> &str {
        let end = (end as usize).min(self.text.len());
        let start = (start as usize).min(end);
        self.text.get(start..end).unwrap_or("")
    }
}
