//! Mapping table implementation for bidirectional range translation.
//!
//! A table maps ranges of the composite document (the *source*) to ranges
//! of one virtual document (the *target*). Entries keep insertion order and
//! may overlap on either side. Queries use overlap, not containment, and
//! return every hit.

use tessera_carton::bitflags;
use tessera_carton::SmallVec;

use crate::SourceRange;

bitflags! {
    /// Which language features may traverse a mapping entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Hover and other point queries
        const BASIC = 1 << 0;
        /// Definition, references and rename
        const REFERENCES = 1 << 1;
        /// Diagnostics
        const DIAGNOSTIC = 1 << 2;
        /// Formatting edits
        const FORMATTING = 1 << 3;
    }
}

impl Capabilities {
    /// Flags for template-generated code.
    ///
    /// Diagnostic-only entries bridge generated helper code back to the
    /// source for error reporting but stay invisible to navigation.
    #[inline]
    pub fn template(diagnostic_only: bool, formatting: bool) -> Self {
        let mut caps = Self::DIAGNOSTIC;
        if !diagnostic_only {
            caps |= Self::BASIC | Self::REFERENCES;
        }
        if formatting {
            caps |= Self::FORMATTING;
        }
        caps
    }
}

/// How a range is translated through an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingMode {
    /// Sub-ranges keep their relative offset on the other side.
    Offset,
    /// The entry is one opaque unit; any hit yields the whole counterpart.
    Gate,
}

/// A single mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingEntry {
    /// Range in the composite document
    pub source: SourceRange,
    /// Range in the virtual document
    pub target: SourceRange,
    pub mode: MappingMode,
    pub capabilities: Capabilities,
}

impl MappingEntry {
    pub fn new(
        source: SourceRange,
        target: SourceRange,
        mode: MappingMode,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            source,
            target,
            mode,
            capabilities,
        }
    }

    /// Verbatim copy with every capability.
    pub fn verbatim(source: SourceRange, target: SourceRange) -> Self {
        Self::new(source, target, MappingMode::Offset, Capabilities::all())
    }
}

/// One query result: the translated range plus the entry that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingHit<'a> {
    pub range: SourceRange,
    pub entry: &'a MappingEntry,
}

impl MappingHit<'_> {
    #[inline]
    pub fn mode(&self) -> MappingMode {
        self.entry.mode
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.entry.capabilities
    }
}

pub type Hits<'a> = SmallVec<[MappingHit<'a>; 4]>;

/// Ordered mapping table for one (composite, virtual) document pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a list of entries, keeping their order.
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// Add an entry.
    #[inline]
    pub fn push(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    /// Get all entries.
    #[inline]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Composite range to virtual ranges.
    pub fn forward(&self, range: SourceRange) -> Hits<'_> {
        self.query(range, Capabilities::empty(), Direction::Forward)
    }

    /// Virtual range to composite ranges.
    pub fn reverse(&self, range: SourceRange) -> Hits<'_> {
        self.query(range, Capabilities::empty(), Direction::Reverse)
    }

    /// [`forward`](Self::forward) restricted to entries carrying `required`.
    pub fn forward_for(&self, range: SourceRange, required: Capabilities) -> Hits<'_> {
        self.query(range, required, Direction::Forward)
    }

    /// [`reverse`](Self::reverse) restricted to entries carrying `required`.
    pub fn reverse_for(&self, range: SourceRange, required: Capabilities) -> Hits<'_> {
        self.query(range, required, Direction::Reverse)
    }

    /// First forward hit carrying `required`.
    pub fn first_forward(&self, range: SourceRange, required: Capabilities) -> Option<SourceRange> {
        self.forward_for(range, required).first().map(|h| h.range)
    }

    /// First reverse hit carrying `required`.
    pub fn first_reverse(&self, range: SourceRange, required: Capabilities) -> Option<SourceRange> {
        self.reverse_for(range, required).first().map(|h| h.range)
    }

    fn query(&self, range: SourceRange, required: Capabilities, direction: Direction) -> Hits<'_> {
        self.entries
            .iter()
            .filter(|entry| entry.capabilities.contains(required))
            .filter_map(|entry| {
                let (from, to) = match direction {
                    Direction::Forward => (entry.source, entry.target),
                    Direction::Reverse => (entry.target, entry.source),
                };
                translate(range, from, to, entry.mode).map(|range| MappingHit { range, entry })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Reverse,
}

/// Whether `query` touches `stored`. Empty ranges (cursor positions)
/// touch a range when they sit anywhere inside it, ends included.
#[inline]
fn overlaps(query: SourceRange, stored: SourceRange) -> bool {
    if query.is_empty() || stored.is_empty() {
        stored.start <= query.end && query.start <= stored.end
    } else {
        query.start < stored.end && stored.start < query.end
    }
}

fn translate(
    query: SourceRange,
    from: SourceRange,
    to: SourceRange,
    mode: MappingMode,
) -> Option<SourceRange> {
    if !overlaps(query, from) {
        return None;
    }
    match mode {
        MappingMode::Gate => Some(to),
        MappingMode::Offset => {
            let start = query.start.clamp(from.start, from.end) - from.start;
            let end = query.end.clamp(from.start, from.end) - from.start;
            let len = to.len();
            Some(SourceRange::new(
                to.start + start.min(len),
                to.start + end.min(len),
            ))
        }
    }
}
