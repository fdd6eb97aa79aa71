//! Document management for open composite documents.
//!
//! This module handles document storage, versioning, and incremental changes.

mod store;

pub use store::*;
