//! Composite document block splitter.
//!
//! Byte-level scan: `memchr` finds the next `<`, the start tag is read in
//! place, and the end tag is located by a case-insensitive search. Nested
//! `<template>` elements inside the template block are tracked by depth.

use memchr::{memchr, memmem};
use rustc_hash::FxHashMap;
use tessera_carton::CompactString;
use tessera_relief::{
    BlockLocation, SfcCustomBlock, SfcDescriptor, SfcScriptBlock, SfcStyleBlock,
    SfcTemplateBlock,
};

// Static closing tags for fast comparison (avoid format!)
const CLOSING_TEMPLATE: &[u8] = b"</template";
const CLOSING_SCRIPT: &[u8] = b"</script";
const CLOSING_STYLE: &[u8] = b"</style";

const TAG_TEMPLATE: &[u8] = b"template";
const TAG_SCRIPT: &[u8] = b"script";
const TAG_STYLE: &[u8] = b"style";

/// A block-level problem. The first block of a kind always wins, later
/// duplicates are reported and dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SfcError {
    pub message: CompactString,
    pub code: &'static str,
    pub loc: BlockLocation,
}

impl SfcError {
    fn duplicate(block: &str, code: &'static str, loc: BlockLocation) -> Self {
        Self {
            message: tessera_carton::format_compact!("SFC can only contain one {block} block"),
            code,
            loc,
        }
    }
}

struct RawBlock<'a> {
    tag: &'a str,
    attrs: FxHashMap<CompactString, CompactString>,
    loc: BlockLocation,
    self_closing: bool,
}

/// Split `source` into blocks.
///
/// Never fails: duplicate `<template>`, `<script>` or `<script setup>`
/// blocks are returned as errors next to the descriptor.
pub fn parse_sfc(source: &str) -> (SfcDescriptor, Vec<SfcError>) {
    let mut descriptor = SfcDescriptor {
        source: source.to_owned(),
        ..Default::default()
    };
    let mut errors = Vec::new();

    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len {
        let Some(next_lt) = memchr(b'<', &bytes[pos..]) else {
            break;
        };
        pos += next_lt;

        if bytes[pos..].starts_with(b"<!--") {
            pos = match memmem::find(&bytes[pos + 4..], b"-->") {
                Some(end) => pos + 4 + end + 3,
                None => len,
            };
            continue;
        }

        let Some(raw) = parse_block(bytes, source, pos) else {
            pos += 1;
            continue;
        };
        pos = raw.loc.tag_end.max(pos + 1);

        let content = if raw.self_closing {
            String::new()
        } else {
            source[raw.loc.start..raw.loc.end].to_owned()
        };
        let lang = raw.attrs.get("lang").cloned();
        let tag_bytes = raw.tag.as_bytes();

        if tag_name_eq(tag_bytes, TAG_TEMPLATE) {
            if descriptor.template.is_some() {
                errors.push(SfcError::duplicate("<template>", "DUPLICATE_TEMPLATE", raw.loc));
                continue;
            }
            descriptor.template = Some(SfcTemplateBlock {
                content,
                loc: raw.loc,
                lang,
                attrs: raw.attrs,
            });
        } else if tag_name_eq(tag_bytes, TAG_SCRIPT) {
            let setup = raw.attrs.contains_key("setup");
            let block = SfcScriptBlock {
                content,
                loc: raw.loc,
                lang,
                setup,
                attrs: raw.attrs,
            };
            let slot = if setup {
                &mut descriptor.script_setup
            } else {
                &mut descriptor.script
            };
            if slot.is_some() {
                let (name, code) = if setup {
                    ("<script setup>", "DUPLICATE_SCRIPT_SETUP")
                } else {
                    ("<script>", "DUPLICATE_SCRIPT")
                };
                errors.push(SfcError::duplicate(name, code, block.loc));
                continue;
            }
            *slot = Some(block);
        } else if tag_name_eq(tag_bytes, TAG_STYLE) {
            let scoped = raw.attrs.contains_key("scoped");
            let module = raw.attrs.get("module").map(|v| {
                if v.is_empty() {
                    CompactString::const_new("$style")
                } else {
                    v.clone()
                }
            });
            descriptor.styles.push(SfcStyleBlock {
                content,
                loc: raw.loc,
                lang,
                scoped,
                module,
                attrs: raw.attrs,
            });
        } else {
            descriptor.custom_blocks.push(SfcCustomBlock {
                block_type: raw.tag.into(),
                content,
                loc: raw.loc,
                attrs: raw.attrs,
            });
        }
    }

    (descriptor, errors)
}

#[inline(always)]
fn tag_name_eq(name: &[u8], expected: &[u8]) -> bool {
    name.len() == expected.len() && name.eq_ignore_ascii_case(expected)
}

#[inline]
fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Read the block whose start tag opens at `start`.
fn parse_block<'a>(bytes: &[u8], source: &'a str, start: usize) -> Option<RawBlock<'a>> {
    let len = bytes.len();
    let mut pos = start + 1;

    if pos >= len || !bytes[pos].is_ascii_alphabetic() {
        return None;
    }
    let name_start = pos;
    while pos < len && is_tag_name_byte(bytes[pos]) {
        pos += 1;
    }
    let tag = &source[name_start..pos];

    let mut attrs = FxHashMap::default();
    let mut self_closing = false;

    // Attributes
    loop {
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= len {
            return None;
        }
        match bytes[pos] {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                self_closing = true;
                pos += 2;
                break;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < len
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        if pos == attr_start {
            // Stray `/`
            pos += 1;
            continue;
        }
        let name = CompactString::from(&source[attr_start..pos]);

        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'=' {
            pos += 1;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < len && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                pos += 1;
                let value_start = pos;
                let end = memchr(quote, &bytes[pos..])?;
                pos += end + 1;
                CompactString::from(&source[value_start..value_start + end])
            } else {
                let value_start = pos;
                while pos < len && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                CompactString::from(&source[value_start..pos])
            }
        } else {
            CompactString::default()
        };
        attrs.insert(name, value);
    }

    let content_start = pos;
    if self_closing {
        return Some(RawBlock {
            tag,
            attrs,
            loc: BlockLocation {
                start: content_start,
                end: content_start,
                tag_start: start,
                tag_end: pos,
            },
            self_closing,
        });
    }

    let tag_bytes = tag.as_bytes();
    let (content_end, tag_end) = if tag_name_eq(tag_bytes, TAG_TEMPLATE) {
        find_template_end(bytes, content_start)
    } else {
        let closing: Vec<u8>;
        let needle = if tag_name_eq(tag_bytes, TAG_SCRIPT) {
            CLOSING_SCRIPT
        } else if tag_name_eq(tag_bytes, TAG_STYLE) {
            CLOSING_STYLE
        } else {
            closing = [b"</".as_slice(), tag_bytes].concat();
            &closing
        };
        find_closing(bytes, content_start, needle)
    };

    Some(RawBlock {
        tag,
        attrs,
        loc: BlockLocation {
            start: content_start,
            end: content_end,
            tag_start: start,
            tag_end,
        },
        self_closing,
    })
}

/// Find `needle` (an end tag prefix) case-insensitively from `from`.
/// Returns `(content_end, tag_end)`; an unclosed block runs to the end.
fn find_closing(bytes: &[u8], from: usize, needle: &[u8]) -> (usize, usize) {
    let mut pos = from;
    while let Some(lt) = memchr(b'<', &bytes[pos..]) {
        let at = pos + lt;
        if closes_at(bytes, at, needle) {
            return (at, end_tag_end(bytes, at + needle.len()));
        }
        pos = at + 1;
    }
    (bytes.len(), bytes.len())
}

/// Template content may contain nested `<template>` elements.
fn find_template_end(bytes: &[u8], from: usize) -> (usize, usize) {
    let mut depth = 0usize;
    let mut pos = from;
    let open = [b"<".as_slice(), TAG_TEMPLATE].concat();

    while let Some(lt) = memchr(b'<', &bytes[pos..]) {
        let at = pos + lt;
        if closes_at(bytes, at, CLOSING_TEMPLATE) {
            if depth == 0 {
                return (at, end_tag_end(bytes, at + CLOSING_TEMPLATE.len()));
            }
            depth -= 1;
            pos = at + CLOSING_TEMPLATE.len();
            continue;
        }
        if closes_at(bytes, at, &open) {
            let gt = memchr(b'>', &bytes[at..]).map(|i| at + i);
            let self_closing = gt.is_some_and(|gt| gt > at && bytes[gt - 1] == b'/');
            if !self_closing {
                depth += 1;
            }
            pos = gt.map_or(at + 1, |gt| gt + 1);
            continue;
        }
        pos = at + 1;
    }
    (bytes.len(), bytes.len())
}

/// `needle` matches at `at` and is followed by a tag name boundary.
#[inline]
fn closes_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    let end = at + needle.len();
    end <= bytes.len()
        && bytes[at..end].eq_ignore_ascii_case(needle)
        && bytes.get(end).map_or(true, |b| !is_tag_name_byte(*b))
}

#[inline]
fn end_tag_end(bytes: &[u8], from: usize) -> usize {
    memchr(b'>', &bytes[from..]).map_or(bytes.len(), |i| from + i + 1)
}
