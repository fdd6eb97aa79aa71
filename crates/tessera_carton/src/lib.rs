//! Carton - the toolbox shared by every tessera crate.
//!
//! Holds the small utilities that the parser, the virtual-code layer and
//! the project host all reach for:
//!
//! - **hash**: xxHash3 content hashing used for snapshot versions
//! - **line_index**: byte offset <-> LSP position conversion (UTF-16 columns)
//! - **text_edit**: applying `TextEdit`s to a string
//!
//! Commonly used third-party types are re-exported so downstream crates
//! agree on one set of collections.

pub mod hash;
pub mod line_index;
pub mod text_edit;

pub use line_index::LineIndex;
pub use text_edit::apply_text_edits;

// Re-export compact_str::CompactString for convenience
pub use compact_str::{format_compact, CompactString};
pub use compact_str::CompactString as String;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export bitflags for flag types
pub use bitflags::bitflags;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Protocol types used across the workspace
pub use lsp_types;
