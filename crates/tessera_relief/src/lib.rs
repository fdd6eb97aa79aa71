//! Relief - the sculptured surface of a composite document.
//!
//! A composite document (a Vue-style single-file component) is split into
//! blocks by [`sfc`], and the template block is represented by the node
//! tree in [`ast`]. All locations are byte offsets into the text the tree
//! was parsed from.

pub mod ast;
pub mod errors;
pub mod sfc;

pub use ast::*;
pub use errors::{ErrorCode, ParseError};
pub use sfc::*;
