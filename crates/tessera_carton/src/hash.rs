//! Content hashing for snapshot versions.
//!
//! Open documents are versioned by the hash of their text so that an edit
//! which leaves the text unchanged does not trigger reanalysis.

use xxhash_rust::xxh3::xxh3_64;

/// Compute a 64-bit xxHash3 of the given string.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Render a hash as a fixed-width (16 character) hex string.
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Version string for a piece of content.
///
/// Identical text always yields an identical version.
#[inline]
pub fn content_version(content: &str) -> String {
    hash_to_hex(hash_str(content))
}
