//! `v-for` expression parsing.
//!
//! Splits `(value, key, index) in source` into its parts, each with its own
//! location so every binding can be mapped independently.

use once_cell::sync::Lazy;
use regex::Regex;
use tessera_relief::{ForParseResult, SimpleExpressionNode, SourceLocation};

static FOR_ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\s\S]*?)\s+(?:in|of)\s+(\S[\s\S]*)$").expect("Invalid regex pattern for v-for alias")
});

static FOR_ITERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",([^,\}\]]*)(?:,([^,\}\]]*))?$").expect("Invalid regex pattern for v-for iterator")
});

/// Parse a `v-for` expression. `create_loc` turns absolute template
/// offsets into locations.
///
/// Returns `None` when the expression has no `in`/`of` separator.
pub(crate) fn parse_for_expression(
    exp: &SimpleExpressionNode,
    create_loc: impl Fn(usize, usize) -> SourceLocation,
) -> Option<ForParseResult> {
    let content = exp.content.as_str();
    let base = exp.loc.start.offset as usize;
    let caps = FOR_ALIAS_RE.captures(content)?;
    let lhs = caps.get(1)?.as_str();
    let rhs = caps.get(2)?.as_str().trim();

    let expr_at = |part: &str| {
        let start = base + offset_in(content, part);
        SimpleExpressionNode::new(part, false, create_loc(start, start + part.len()))
    };

    let source = expr_at(rhs);

    let mut value_content = lhs.trim();
    value_content = value_content.strip_prefix('(').unwrap_or(value_content);
    value_content = value_content.strip_suffix(')').unwrap_or(value_content);
    value_content = value_content.trim();

    let mut key = None;
    let mut index = None;
    if let Some(iter_caps) = FOR_ITERATOR_RE.captures(value_content) {
        let part = |i: usize| {
            iter_caps
                .get(i)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
        };
        key = part(1).map(expr_at);
        index = part(2).map(expr_at);
        if let Some(whole) = iter_caps.get(0) {
            value_content = value_content[..whole.start()].trim_end();
        }
    }

    let value = (!value_content.is_empty()).then(|| expr_at(value_content));

    Some(ForParseResult {
        source,
        value,
        key,
        index,
    })
}

/// Byte offset of `inner` within `outer`; `inner` must be a subslice.
#[inline]
fn offset_in(outer: &str, inner: &str) -> usize {
    inner.as_ptr() as usize - outer.as_ptr() as usize
}
