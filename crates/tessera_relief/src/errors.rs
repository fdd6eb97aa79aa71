//! Template parse errors.
//!
//! Parse errors never abort parsing; they are collected next to the tree.

use crate::ast::SourceLocation;

/// Kind of template parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `{{` without a matching `}}`.
    MissingInterpolationEnd,
    /// Element never closed.
    MissingEndTag,
    /// End tag without a matching start tag.
    InvalidEndTag,
    /// Attribute value quote never closed.
    UnterminatedAttributeValue,
    /// `<!--` without `-->`.
    UnterminatedComment,
    /// `v-else`/`v-else-if` without a preceding `v-if`.
    MissingIfBranch,
    /// `v-for` expression that is not `alias in source`.
    InvalidForExpression,
    /// Structural directive without an expression.
    MissingDirectiveExpression,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingInterpolationEnd => "Interpolation end sign was not found.",
            Self::MissingEndTag => "Element is missing end tag.",
            Self::InvalidEndTag => "Invalid end tag.",
            Self::UnterminatedAttributeValue => "Attribute value was not closed.",
            Self::UnterminatedComment => "Comment was not closed.",
            Self::MissingIfBranch => "v-else/v-else-if has no adjacent v-if or v-else-if.",
            Self::InvalidForExpression => "v-for has invalid expression.",
            Self::MissingDirectiveExpression => "Directive is missing its expression.",
        }
    }
}

/// A recoverable template parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} ({}..{})", code.message(), loc.start.offset, loc.end.offset)]
pub struct ParseError {
    pub code: ErrorCode,
    pub loc: SourceLocation,
}

impl ParseError {
    pub fn new(code: ErrorCode, loc: SourceLocation) -> Self {
        Self { code, loc }
    }
}
