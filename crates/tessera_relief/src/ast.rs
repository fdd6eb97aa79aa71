//! Template node tree.
//!
//! The tree is owned (no arena) so a parsed document can be kept alive by
//! the source file that produced it and regenerated from on demand.
//! Structural directives are already lifted: a `v-if` chain is an
//! [`IfNode`], a `v-for` element is wrapped in a [`ForNode`].

use serde::{Deserialize, Serialize};
use tessera_carton::CompactString;

/// Node type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Root = 0,
    Element = 1,
    Text = 2,
    Comment = 3,
    SimpleExpression = 4,
    Interpolation = 5,
    Attribute = 6,
    Directive = 7,
    CompoundExpression = 8,
    If = 9,
    IfBranch = 10,
    For = 11,
}

impl NodeType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Element => "Element",
            Self::Text => "Text",
            Self::Comment => "Comment",
            Self::SimpleExpression => "SimpleExpression",
            Self::Interpolation => "Interpolation",
            Self::Attribute => "Attribute",
            Self::Directive => "Directive",
            Self::CompoundExpression => "CompoundExpression",
            Self::If => "If",
            Self::IfBranch => "IfBranch",
            Self::For => "For",
        }
    }
}

/// Element type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ElementType {
    #[default]
    Element = 0,
    Component = 1,
    Slot = 2,
    Template = 3,
}

/// Source position in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    /// Byte offset from start of the parsed text
    pub offset: u32,
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number
    pub column: u32,
}

impl Position {
    pub const fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Source location span [start, end)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: CompactString,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position, source: impl Into<CompactString>) -> Self {
        Self {
            start,
            end,
            source: source.into(),
        }
    }

    /// Span length in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.offset.saturating_sub(self.start.offset)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Root of a template tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootNode {
    pub children: Vec<TemplateChildNode>,
    /// The text the tree was parsed from.
    pub source: String,
    pub loc: SourceLocation,
}

impl RootNode {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            children: Vec::new(),
            source: source.into(),
            loc: SourceLocation::default(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Root
    }
}

/// Any node that can appear as a child in the template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChildNode {
    Element(Box<ElementNode>),
    Text(TextNode),
    Comment(CommentNode),
    Interpolation(InterpolationNode),
    Compound(CompoundExpressionNode),
    If(Box<IfNode>),
    For(Box<ForNode>),
}

impl TemplateChildNode {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Element(_) => NodeType::Element,
            Self::Text(_) => NodeType::Text,
            Self::Comment(_) => NodeType::Comment,
            Self::Interpolation(_) => NodeType::Interpolation,
            Self::Compound(_) => NodeType::CompoundExpression,
            Self::If(_) => NodeType::If,
            Self::For(_) => NodeType::For,
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Element(n) => &n.loc,
            Self::Text(n) => &n.loc,
            Self::Comment(n) => &n.loc,
            Self::Interpolation(n) => &n.loc,
            Self::Compound(n) => &n.loc,
            Self::If(n) => &n.loc,
            Self::For(n) => &n.loc,
        }
    }

    /// Whitespace-only text, which never separates a `v-if` chain.
    pub fn is_whitespace_text(&self) -> bool {
        matches!(self, Self::Text(t) if t.content.trim().is_empty())
    }
}

/// Element node
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: CompactString,
    pub tag_type: ElementType,
    pub props: Vec<PropNode>,
    pub children: Vec<TemplateChildNode>,
    pub is_self_closing: bool,
    pub loc: SourceLocation,
}

impl ElementNode {
    pub fn new(tag: impl Into<CompactString>, loc: SourceLocation) -> Self {
        Self {
            tag: tag.into(),
            tag_type: ElementType::Element,
            props: Vec::new(),
            children: Vec::new(),
            is_self_closing: false,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Element
    }

    /// Find a directive by name (`if`, `for`, `bind`, ...).
    pub fn find_directive(&self, name: &str) -> Option<&DirectiveNode> {
        self.props.iter().find_map(|p| match p {
            PropNode::Directive(d) if d.name == name => Some(&**d),
            _ => None,
        })
    }

    /// Find a static attribute by name.
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeNode> {
        self.props.iter().find_map(|p| match p {
            PropNode::Attribute(a) if a.name == name => Some(a),
            _ => None,
        })
    }
}

/// Element property: a static attribute or a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum PropNode {
    Attribute(AttributeNode),
    Directive(Box<DirectiveNode>),
}

impl PropNode {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Self::Attribute(a) => &a.loc,
            Self::Directive(d) => &d.loc,
        }
    }
}

/// Static attribute node (`name="value"`)
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub name: CompactString,
    pub name_loc: SourceLocation,
    /// Attribute value; its location includes the quotes when quoted.
    pub value: Option<TextNode>,
    pub loc: SourceLocation,
}

impl AttributeNode {
    pub fn new(name: impl Into<CompactString>, loc: SourceLocation) -> Self {
        let name = name.into();
        Self {
            name_loc: loc.clone(),
            name,
            value: None,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Attribute
    }
}

/// Directive node (`v-bind:arg.mod="exp"`, `:arg`, `@event`, `#slot`)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveNode {
    /// Normalized name without prefix (`bind`, `on`, `slot`, `model`, ...)
    pub name: CompactString,
    /// The attribute name as written
    pub raw_name: CompactString,
    pub exp: Option<SimpleExpressionNode>,
    pub arg: Option<SimpleExpressionNode>,
    pub modifiers: Vec<CompactString>,
    pub loc: SourceLocation,
}

impl DirectiveNode {
    pub fn new(name: impl Into<CompactString>, loc: SourceLocation) -> Self {
        Self {
            raw_name: loc.source.clone(),
            name: name.into(),
            exp: None,
            arg: None,
            modifiers: Vec::new(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Directive
    }
}

/// Text node
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub content: CompactString,
    pub loc: SourceLocation,
}

impl TextNode {
    pub fn new(content: impl Into<CompactString>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Text
    }
}

/// Comment node
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub content: CompactString,
    pub loc: SourceLocation,
}

impl CommentNode {
    pub fn new(content: impl Into<CompactString>, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Comment
    }
}

/// Simple expression node; `loc` covers exactly `content`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleExpressionNode {
    pub content: CompactString,
    pub is_static: bool,
    pub loc: SourceLocation,
}

impl SimpleExpressionNode {
    pub fn new(content: impl Into<CompactString>, is_static: bool, loc: SourceLocation) -> Self {
        Self {
            content: content.into(),
            is_static,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::SimpleExpression
    }
}

/// Interpolation node (`{{ content }}`)
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationNode {
    /// Everything between the delimiters, whitespace included.
    pub content: SimpleExpressionNode,
    pub loc: SourceLocation,
}

impl InterpolationNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::Interpolation
    }
}

/// Adjacent text and interpolations merged into one node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundExpressionNode {
    pub children: Vec<TemplateChildNode>,
    pub loc: SourceLocation,
}

impl CompoundExpressionNode {
    pub fn new(loc: SourceLocation) -> Self {
        Self {
            children: Vec::new(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::CompoundExpression
    }
}

/// `v-if` / `v-else-if` / `v-else` chain
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub branches: Vec<IfBranchNode>,
    pub loc: SourceLocation,
}

impl IfNode {
    pub fn new(loc: SourceLocation) -> Self {
        Self {
            branches: Vec::new(),
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::If
    }
}

/// One branch of an [`IfNode`]; `condition` is `None` for `v-else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfBranchNode {
    pub condition: Option<SimpleExpressionNode>,
    pub children: Vec<TemplateChildNode>,
    /// The branch was written on a `<template>` wrapper, whose children
    /// became the branch children.
    pub is_template_if: bool,
    pub loc: SourceLocation,
}

impl IfBranchNode {
    pub fn new(
        condition: Option<SimpleExpressionNode>,
        loc: SourceLocation,
        is_template_if: bool,
    ) -> Self {
        Self {
            condition,
            children: Vec::new(),
            is_template_if,
            loc,
        }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::IfBranch
    }
}

/// `v-for` node
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    /// The whole `v-for` expression as written.
    pub expression: SimpleExpressionNode,
    /// `None` when the expression is not of the form `alias in source`.
    pub parse_result: Option<ForParseResult>,
    pub children: Vec<TemplateChildNode>,
    /// The loop was written on a `<template>` wrapper.
    pub is_template_for: bool,
    pub loc: SourceLocation,
}

impl ForNode {
    pub fn node_type(&self) -> NodeType {
        NodeType::For
    }
}

/// Parsed `(value, key, index) in source`
#[derive(Debug, Clone, PartialEq)]
pub struct ForParseResult {
    pub source: SimpleExpressionNode,
    pub value: Option<SimpleExpressionNode>,
    pub key: Option<SimpleExpressionNode>,
    pub index: Option<SimpleExpressionNode>,
}
