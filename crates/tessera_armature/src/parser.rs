//! Template parser.
//!
//! A single-pass scanner that builds the owned relief tree directly.
//! When an element closes, its children go through a structural pass that
//! lifts `v-for` elements into [`ForNode`]s, folds `v-if` / `v-else-if` /
//! `v-else` siblings into one [`IfNode`], and merges adjacent text and
//! interpolations into compound nodes.

use memchr::{memchr, memchr2, memmem};
use tessera_carton::CompactString;
use tessera_relief::ast::*;
use tessera_relief::errors::{ErrorCode, ParseError};

use crate::for_expression::parse_for_expression;
use crate::tags::{is_builtin_component, is_native_tag, is_void_tag};

/// Parser context for building the tree
pub struct Parser<'s> {
    /// Source code
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    /// Open elements, innermost last
    stack: Vec<ElementNode>,
    /// Children of the root
    root_children: Vec<TemplateChildNode>,
    /// Start of pending text, flushed before the next node
    text_start: Option<usize>,
    /// Errors collected during parsing
    errors: Vec<ParseError>,
    /// Newline positions for calculating line/column
    newlines: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    If,
    ElseIf,
    Else,
}

impl<'s> Parser<'s> {
    /// Create a new parser
    pub fn new(source: &'s str) -> Self {
        let newlines = memchr::memchr_iter(b'\n', source.as_bytes()).collect();
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            stack: Vec::new(),
            root_children: Vec::new(),
            text_start: None,
            errors: Vec::new(),
            newlines,
        }
    }

    /// Parse the source and return the tree with every recoverable error.
    pub fn parse(mut self) -> (RootNode, Vec<ParseError>) {
        let len = self.bytes.len();

        while self.pos < len {
            let Some(next) = memchr2(b'<', b'{', &self.bytes[self.pos..]) else {
                self.mark_text(self.pos);
                self.pos = len;
                break;
            };
            let at = self.pos + next;
            if at > self.pos {
                self.mark_text(self.pos);
            }
            self.pos = at;

            let rest = &self.bytes[at..];
            if rest.starts_with(b"{{") {
                self.parse_interpolation(at);
            } else if rest.starts_with(b"<!--") {
                self.parse_comment(at);
            } else if rest.starts_with(b"</") && rest.get(2).is_some_and(u8::is_ascii_alphabetic) {
                self.parse_end_tag(at);
            } else if rest.len() > 1 && rest[1].is_ascii_alphabetic() && rest[0] == b'<' {
                self.parse_start_tag(at);
            } else if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
                self.parse_bogus_comment(at);
            } else {
                self.mark_text(at);
                self.pos = at + 1;
            }
        }

        self.flush_text(len);
        self.handle_unclosed_elements();

        let children = std::mem::take(&mut self.root_children);
        let children = self.lift_structural(children);

        let mut root = RootNode::new(self.source);
        root.loc = self.create_loc(0, len);
        root.children = children;
        (root, self.errors)
    }

    /// Get source slice
    fn get_source(&self, start: usize, end: usize) -> &'s str {
        &self.source[start..end]
    }

    /// Calculate position from byte offset
    fn get_pos(&self, offset: usize) -> Position {
        let line = match self.newlines.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i + 1,
        };

        let column = if line == 1 {
            offset + 1
        } else {
            offset - self.newlines[line - 2]
        };

        Position::new(offset as u32, line as u32, column as u32)
    }

    /// Create a source location
    fn create_loc(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::new(
            self.get_pos(start),
            self.get_pos(end),
            self.get_source(start, end),
        )
    }

    /// Add child to current context (stack top or root)
    fn add_child(&mut self, child: TemplateChildNode) {
        if let Some(element) = self.stack.last_mut() {
            element.children.push(child);
        } else {
            self.root_children.push(child);
        }
    }

    fn error(&mut self, code: ErrorCode, start: usize, end: usize) {
        let loc = self.create_loc(start, end);
        self.errors.push(ParseError::new(code, loc));
    }

    #[inline]
    fn mark_text(&mut self, at: usize) {
        if self.text_start.is_none() {
            self.text_start = Some(at);
        }
    }

    /// Emit pending text ending at `end`.
    fn flush_text(&mut self, end: usize) {
        if let Some(start) = self.text_start.take() {
            if start < end {
                let loc = self.create_loc(start, end);
                let text = TextNode::new(self.get_source(start, end), loc);
                self.add_child(TemplateChildNode::Text(text));
            }
        }
    }

    /// Handle unclosed elements at end of parsing
    fn handle_unclosed_elements(&mut self) {
        let len = self.bytes.len();
        while let Some(element) = self.stack.pop() {
            let start = element.loc.start.offset as usize;
            self.error(ErrorCode::MissingEndTag, start, element.loc.end.offset as usize);
            let element = self.finish_element(element, len);
            self.add_child(TemplateChildNode::Element(Box::new(element)));
        }
    }

    /// Process interpolation starting at `{{`
    fn parse_interpolation(&mut self, start: usize) {
        let inner_start = start + 2;
        let Some(close) = memmem::find(&self.bytes[inner_start..], b"}}") else {
            self.error(ErrorCode::MissingInterpolationEnd, start, inner_start);
            self.mark_text(start);
            self.pos = inner_start;
            return;
        };
        let inner_end = inner_start + close;
        let end = inner_end + 2;

        self.flush_text(start);
        let content = SimpleExpressionNode::new(
            self.get_source(inner_start, inner_end),
            false,
            self.create_loc(inner_start, inner_end),
        );
        let interpolation = InterpolationNode {
            content,
            loc: self.create_loc(start, end),
        };
        self.add_child(TemplateChildNode::Interpolation(interpolation));
        self.pos = end;
    }

    /// Process comment starting at `<!--`
    fn parse_comment(&mut self, start: usize) {
        self.flush_text(start);
        let inner_start = start + 4;
        let (inner_end, end) = match memmem::find(&self.bytes[inner_start..], b"-->") {
            Some(i) => (inner_start + i, inner_start + i + 3),
            None => {
                self.error(ErrorCode::UnterminatedComment, start, inner_start);
                (self.bytes.len(), self.bytes.len())
            }
        };
        let comment = CommentNode::new(
            self.get_source(inner_start, inner_end),
            self.create_loc(start, end),
        );
        self.add_child(TemplateChildNode::Comment(comment));
        self.pos = end;
    }

    /// `<!DOCTYPE ...>` and `<?...>` become comments.
    fn parse_bogus_comment(&mut self, start: usize) {
        self.flush_text(start);
        let end = memchr(b'>', &self.bytes[start..]).map_or(self.bytes.len(), |i| start + i + 1);
        let inner_end = if end > start + 2 && self.bytes[end - 1] == b'>' {
            end - 1
        } else {
            end
        };
        let comment = CommentNode::new(
            self.get_source(start + 2, inner_end.max(start + 2)),
            self.create_loc(start, end),
        );
        self.add_child(TemplateChildNode::Comment(comment));
        self.pos = end;
    }

    #[inline]
    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Process a start tag at `<`
    fn parse_start_tag(&mut self, start: usize) {
        self.flush_text(start);
        let len = self.bytes.len();
        self.pos = start + 1;
        while self.pos < len
            && !self.bytes[self.pos].is_ascii_whitespace()
            && !matches!(self.bytes[self.pos], b'>' | b'/')
        {
            self.pos += 1;
        }
        let tag = self.get_source(start + 1, self.pos);

        let mut props = Vec::new();
        let mut is_self_closing = false;
        loop {
            self.skip_whitespace();
            if self.pos >= len {
                break;
            }
            match self.bytes[self.pos] {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'>') => {
                    is_self_closing = true;
                    self.pos += 2;
                    break;
                }
                b'/' => {
                    self.pos += 1;
                }
                _ => {
                    if let Some(prop) = self.parse_attribute() {
                        props.push(prop);
                    }
                }
            }
        }

        let tag_end = self.pos;
        let mut element = ElementNode::new(tag, self.create_loc(start, tag_end));
        element.props = props;
        element.is_self_closing = is_self_closing;
        element.tag_type = determine_element_type(&element);

        if is_self_closing || is_void_tag(tag) {
            self.add_child(TemplateChildNode::Element(Box::new(element)));
            return;
        }

        let raw_text = matches!(tag, "script" | "style");
        self.stack.push(element);
        if raw_text {
            self.parse_raw_text(tag);
        }
    }

    /// Content of `<script>`/`<style>` inside a template is kept as text.
    fn parse_raw_text(&mut self, tag: &str) {
        let start = self.pos;
        let closing = [b"</".as_slice(), tag.as_bytes()].concat();
        let mut search = start;
        let end = loop {
            match memmem::find(&self.bytes[search..], b"</") {
                Some(i) => {
                    let at = search + i;
                    let candidate = &self.bytes[at..(at + closing.len()).min(self.bytes.len())];
                    if candidate.eq_ignore_ascii_case(&closing) {
                        break at;
                    }
                    search = at + 2;
                }
                None => break self.bytes.len(),
            }
        };
        if end > start {
            let text = TextNode::new(self.get_source(start, end), self.create_loc(start, end));
            self.add_child(TemplateChildNode::Text(text));
        }
        self.pos = end;
    }

    /// Parse one attribute or directive at the current position.
    fn parse_attribute(&mut self) -> Option<PropNode> {
        let len = self.bytes.len();
        let name_start = self.pos;
        while self.pos < len {
            match self.bytes[self.pos] {
                b'[' => {
                    // Dynamic argument may contain anything but `]`
                    self.pos = memchr(b']', &self.bytes[self.pos..])
                        .map_or(len, |i| self.pos + i + 1);
                }
                b'=' | b'>' if self.pos > name_start => break,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'>') => break,
                b if b.is_ascii_whitespace() => break,
                _ => self.pos += 1,
            }
        }
        let name_end = self.pos;
        if name_end == name_start {
            self.pos += 1;
            return None;
        }

        let mut value = None;
        let mut end = name_end;
        let after_name = self.pos;
        self.skip_whitespace();
        if self.bytes.get(self.pos) == Some(&b'=') {
            self.pos += 1;
            self.skip_whitespace();
            match self.bytes.get(self.pos).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let open = self.pos;
                    let value_start = open + 1;
                    match memchr(quote, &self.bytes[value_start..]) {
                        Some(i) => {
                            value = Some((open, value_start, value_start + i, value_start + i + 1));
                            end = value_start + i + 1;
                        }
                        None => {
                            self.error(ErrorCode::UnterminatedAttributeValue, open, len);
                            value = Some((open, value_start, len, len));
                            end = len;
                        }
                    }
                }
                Some(_) => {
                    let value_start = self.pos;
                    let mut i = value_start;
                    while i < len && !self.bytes[i].is_ascii_whitespace() && self.bytes[i] != b'>' {
                        i += 1;
                    }
                    value = Some((value_start, value_start, i, i));
                    end = i;
                }
                None => end = self.pos,
            }
            self.pos = end;
        } else {
            self.pos = after_name;
        }

        let raw_name = self.get_source(name_start, name_end);
        let loc = self.create_loc(name_start, end);

        if is_directive(raw_name) {
            let mut dir = self.parse_directive_name(raw_name, name_start, loc);
            if let Some((_, value_start, value_end, _)) = value {
                if value_end > value_start {
                    dir.exp = Some(SimpleExpressionNode::new(
                        self.get_source(value_start, value_end),
                        false,
                        self.create_loc(value_start, value_end),
                    ));
                }
            }
            return Some(PropNode::Directive(Box::new(dir)));
        }

        let mut attr = AttributeNode::new(raw_name, loc);
        attr.name_loc = self.create_loc(name_start, name_end);
        if let Some((outer_start, value_start, value_end, outer_end)) = value {
            attr.value = Some(TextNode::new(
                self.get_source(value_start, value_end),
                self.create_loc(outer_start, outer_end),
            ));
        }
        Some(PropNode::Attribute(attr))
    }

    /// Split a directive attribute name into name, argument and modifiers.
    fn parse_directive_name(
        &self,
        raw: &str,
        name_start: usize,
        loc: SourceLocation,
    ) -> DirectiveNode {
        let (name, mut rest) = match raw.as_bytes()[0] {
            b':' => ("bind", 1),
            b'.' => ("bind", 1),
            b'@' => ("on", 1),
            b'#' => ("slot", 1),
            _ => {
                let body = &raw[2..];
                let end = body.find([':', '.']).unwrap_or(body.len());
                let name = &body[..end];
                let mut rest = 2 + end;
                if raw.as_bytes().get(rest) == Some(&b':') {
                    rest += 1;
                }
                (name, rest)
            }
        };

        let mut dir = DirectiveNode::new(name, loc);
        dir.raw_name = raw.into();

        let has_arg = rest < raw.len()
            && (raw.as_bytes()[0] != b'v' || raw.as_bytes()[rest - 1] == b':');
        if has_arg {
            let arg_start = rest;
            let (content_start, content_end, next, is_static) = if raw.as_bytes()[rest] == b'[' {
                let close = raw[rest..].find(']').map_or(raw.len(), |i| rest + i);
                (rest + 1, close, (close + 1).min(raw.len()), false)
            } else {
                let end = raw[rest..].find('.').map_or(raw.len(), |i| rest + i);
                (arg_start, end, end, true)
            };
            if content_end > content_start {
                dir.arg = Some(SimpleExpressionNode::new(
                    &raw[content_start..content_end],
                    is_static,
                    self.create_loc(name_start + content_start, name_start + content_end),
                ));
            }
            rest = next;
        }

        if raw.starts_with('.') {
            dir.modifiers.push(CompactString::const_new("prop"));
        }
        dir.modifiers.extend(
            raw[rest.min(raw.len())..]
                .split('.')
                .filter(|m| !m.is_empty())
                .map(CompactString::from),
        );

        dir
    }

    /// Process an end tag at `</`
    fn parse_end_tag(&mut self, start: usize) {
        self.flush_text(start);
        let len = self.bytes.len();
        let name_start = start + 2;
        let mut name_end = name_start;
        while name_end < len
            && !self.bytes[name_end].is_ascii_whitespace()
            && self.bytes[name_end] != b'>'
        {
            name_end += 1;
        }
        let end = memchr(b'>', &self.bytes[name_end..]).map_or(len, |i| name_end + i + 1);
        self.pos = end;

        let tag = self.get_source(name_start, name_end);
        let Some(index) = self
            .stack
            .iter()
            .rposition(|e| e.tag.eq_ignore_ascii_case(tag))
        else {
            self.error(ErrorCode::InvalidEndTag, start, end);
            return;
        };

        // Elements opened after the match were never closed
        while self.stack.len() > index + 1 {
            if let Some(element) = self.stack.pop() {
                let element_start = element.loc.start.offset as usize;
                self.error(ErrorCode::MissingEndTag, element_start, element.loc.end.offset as usize);
                let element = self.finish_element(element, start);
                self.add_child(TemplateChildNode::Element(Box::new(element)));
            }
        }
        if let Some(element) = self.stack.pop() {
            let element = self.finish_element(element, end);
            self.add_child(TemplateChildNode::Element(Box::new(element)));
        }
    }

    /// Close `element` at `end` and run the structural pass on its children.
    fn finish_element(&mut self, mut element: ElementNode, end: usize) -> ElementNode {
        let children = std::mem::take(&mut element.children);
        element.children = self.lift_structural(children);
        element.loc = self.create_loc(element.loc.start.offset as usize, end);
        element
    }

    /// Lift `v-for` and `v-if` chains, then merge text runs.
    fn lift_structural(&mut self, children: Vec<TemplateChildNode>) -> Vec<TemplateChildNode> {
        let mut out: Vec<TemplateChildNode> = Vec::with_capacity(children.len());
        // Index in `out` of the conditional still accepting branches
        let mut open_if: Option<usize> = None;

        for child in children {
            let mut element = match child {
                TemplateChildNode::Element(element) => element,
                other => {
                    if !other.is_whitespace_text() && !matches!(other, TemplateChildNode::Comment(_))
                    {
                        open_if = None;
                    }
                    out.push(other);
                    continue;
                }
            };

            let for_dir = take_directive(&mut element, &["for"]);
            let branch_dir = take_directive(&mut element, &["if", "else-if", "else"]);
            let is_template = element.tag_type == ElementType::Template;
            let loc = element.loc.clone();

            let mut node = TemplateChildNode::Element(element);
            if let Some(dir) = for_dir {
                node = self.create_for(*dir, node, is_template && branch_dir.is_none());
            }

            let Some(dir) = branch_dir else {
                open_if = None;
                out.push(node);
                continue;
            };

            let kind = match dir.name.as_str() {
                "if" => BranchKind::If,
                "else-if" => BranchKind::ElseIf,
                _ => BranchKind::Else,
            };

            if kind != BranchKind::If && open_if.is_none() {
                let (start, end) = (dir.loc.start.offset as usize, dir.loc.end.offset as usize);
                self.error(ErrorCode::MissingIfBranch, start, end);
                out.push(node);
                continue;
            }

            let condition = match kind {
                BranchKind::Else => None,
                _ => Some(dir.exp.clone().unwrap_or_else(|| {
                    let (start, end) = (dir.loc.start.offset as usize, dir.loc.end.offset as usize);
                    self.error(ErrorCode::MissingDirectiveExpression, start, end);
                    SimpleExpressionNode::new("", false, self.create_loc(end, end))
                })),
            };

            let unwrap_template = is_template && matches!(node, TemplateChildNode::Element(_));
            let children = match node {
                TemplateChildNode::Element(element) if unwrap_template => element.children,
                other => vec![other],
            };
            let mut branch = IfBranchNode::new(condition, loc.clone(), unwrap_template);
            branch.children = children;

            match (kind, open_if) {
                (BranchKind::If, _) => {
                    let mut if_node = IfNode::new(loc);
                    if_node.branches.push(branch);
                    out.push(TemplateChildNode::If(Box::new(if_node)));
                    open_if = Some(out.len() - 1);
                }
                (_, Some(index)) => {
                    // Whitespace and comments between branches are dropped
                    out.truncate(index + 1);
                    let if_start = out[index].loc().start.offset as usize;
                    let if_loc = self.create_loc(if_start, branch.loc.end.offset as usize);
                    if let TemplateChildNode::If(if_node) = &mut out[index] {
                        if_node.loc = if_loc;
                        if_node.branches.push(branch);
                    }
                    if kind == BranchKind::Else {
                        open_if = None;
                    }
                }
                (_, None) => {}
            }
        }

        self.merge_text_runs(out)
    }

    fn create_for(
        &mut self,
        dir: DirectiveNode,
        node: TemplateChildNode,
        unwrap_template: bool,
    ) -> TemplateChildNode {
        let loc = node.loc().clone();
        let (dir_start, dir_end) = (dir.loc.start.offset as usize, dir.loc.end.offset as usize);

        let expression = match dir.exp {
            Some(exp) => exp,
            None => {
                self.error(ErrorCode::MissingDirectiveExpression, dir_start, dir_end);
                SimpleExpressionNode::new("", false, self.create_loc(dir_end, dir_end))
            }
        };
        let parse_result = if expression.content.is_empty() {
            None
        } else {
            let result = parse_for_expression(&expression, |s, e| self.create_loc(s, e));
            if result.is_none() {
                self.error(ErrorCode::InvalidForExpression, dir_start, dir_end);
            }
            result
        };

        let children = match node {
            TemplateChildNode::Element(element) if unwrap_template => element.children,
            other => vec![other],
        };

        TemplateChildNode::For(Box::new(ForNode {
            expression,
            parse_result,
            children,
            is_template_for: unwrap_template,
            loc,
        }))
    }

    /// Adjacent text and interpolations become one compound node.
    fn merge_text_runs(&self, nodes: Vec<TemplateChildNode>) -> Vec<TemplateChildNode> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut run: Vec<TemplateChildNode> = Vec::new();

        for node in nodes {
            if matches!(
                node,
                TemplateChildNode::Text(_) | TemplateChildNode::Interpolation(_)
            ) {
                run.push(node);
            } else {
                self.flush_run(&mut run, &mut out);
                out.push(node);
            }
        }
        self.flush_run(&mut run, &mut out);
        out
    }

    fn flush_run(&self, run: &mut Vec<TemplateChildNode>, out: &mut Vec<TemplateChildNode>) {
        let has_interpolation = run
            .iter()
            .any(|n| matches!(n, TemplateChildNode::Interpolation(_)));
        if run.len() < 2 || !has_interpolation {
            out.append(run);
            return;
        }
        let start = run[0].loc().start.offset as usize;
        let end = run[run.len() - 1].loc().end.offset as usize;
        let mut compound = CompoundExpressionNode::new(self.create_loc(start, end));
        compound.children = std::mem::take(run);
        out.push(TemplateChildNode::Compound(compound));
    }
}

/// Whether an attribute name is directive syntax
#[inline]
fn is_directive(raw: &str) -> bool {
    match raw.as_bytes() {
        [b':' | b'@' | b'#', _, ..] => true,
        [b'.', c, ..] => c.is_ascii_alphabetic() || *c == b'[',
        [b'v', b'-', c, ..] => c.is_ascii_alphanumeric(),
        _ => false,
    }
}

/// Remove and return the first directive whose name is in `names`.
fn take_directive(element: &mut ElementNode, names: &[&str]) -> Option<Box<DirectiveNode>> {
    let index = element.props.iter().position(
        |p| matches!(p, PropNode::Directive(d) if names.contains(&d.name.as_str())),
    )?;
    match element.props.remove(index) {
        PropNode::Directive(dir) => Some(dir),
        PropNode::Attribute(_) => None,
    }
}

/// Determine element type (element, component, slot, template)
fn determine_element_type(element: &ElementNode) -> ElementType {
    let tag = element.tag.as_str();

    if tag == "slot" {
        return ElementType::Slot;
    }

    if tag == "template" {
        // Template with v-if, v-for, or v-slot is a template element
        let has_structural_directive = element.props.iter().any(|p| {
            matches!(p, PropNode::Directive(d) if matches!(d.name.as_str(), "if" | "else-if" | "else" | "for" | "slot"))
        });
        if has_structural_directive {
            return ElementType::Template;
        }
        return ElementType::Element;
    }

    if is_component(tag) {
        return ElementType::Component;
    }

    ElementType::Element
}

/// Check if tag is a component
fn is_component(tag: &str) -> bool {
    if is_builtin_component(tag) {
        return true;
    }
    if tag.chars().next().is_some_and(|c| c.is_ascii_uppercase()) || tag.contains('.') {
        return true;
    }
    !is_native_tag(tag)
}

/// Parse template content into a tree.
///
/// Never fails; recoverable problems are returned next to the tree.
pub fn parse_template(source: &str) -> (RootNode, Vec<ParseError>) {
    Parser::new(source).parse()
}
