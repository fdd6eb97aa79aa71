//! Template to script transform.
//!
//! Every template node becomes a [`Fragment`]: the statements it emits plus
//! the mapping entries for them, with targets relative to the fragment.
//! Fragments are composed bottom-up with [`Fragment::append`], which
//! rebases the child's targets, so each node kind can be generated and
//! tested on its own.
//!
//! Output for `<div :title="msg">{{ count }}</div>`:
//!
//! ```text
//! {
//! {
//! (msg);
//! { count };
//! }
//! }
//! ```

use serde::Serialize;
use tessera_carton::{smallvec, SmallVec};
use tessera_relief::{
    ElementNode, ElementType, ForNode, IfNode, InterpolationNode, NodeType, PropNode, RootNode,
    SourceLocation, TemplateChildNode,
};

use crate::alt_syntax::PositionMapper;
use crate::source_map::{Capabilities, MappingEntry, MappingMode};
use crate::SourceRange;

/// Declarations the generated statements rely on.
pub const TEMPLATE_PREAMBLE: &str = "\
declare const __VLS_components: Record<string, any>;
declare function __VLS_getVforSourceType<T>(source: T): T extends number ? number[] : T extends string ? string[] : T extends Iterable<infer V> ? V[] : T;
declare let __VLS_for_key: any;
";

/// Generated code plus its mapping entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    text: String,
    mappings: Vec<MappingEntry>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn mappings(&self) -> &[MappingEntry] {
        &self.mappings
    }

    pub fn into_parts(self) -> (String, Vec<MappingEntry>) {
        (self.text, self.mappings)
    }

    /// Append unmapped code.
    #[inline]
    pub fn push_str(&mut self, code: &str) {
        self.text.push_str(code);
    }

    /// Map the next `len` bytes of code, which the caller pushes afterwards.
    pub fn mark(
        &mut self,
        len: usize,
        sources: &[SourceRange],
        mode: MappingMode,
        capabilities: Capabilities,
    ) {
        let start = self.text.len() as u32;
        let target = SourceRange::new(start, start + len as u32);
        self.mappings.extend(
            sources
                .iter()
                .map(|source| MappingEntry::new(*source, target, mode, capabilities)),
        );
    }

    /// Append `code` mapped to every range in `sources`.
    pub fn push_mapped(
        &mut self,
        code: &str,
        sources: &[SourceRange],
        mode: MappingMode,
        capabilities: Capabilities,
    ) {
        self.mark(code.len(), sources, mode, capabilities);
        self.text.push_str(code);
    }

    /// Append another fragment, rebasing its targets.
    pub fn append(&mut self, other: Fragment) {
        let shift = self.text.len() as u32;
        self.text.push_str(&other.text);
        self.mappings.extend(other.mappings.into_iter().map(|mut m| {
            m.target = m.target.shift(shift);
            m
        }));
    }
}

/// Where generated source ranges land in the composite document.
#[derive(Clone, Copy, Default)]
pub struct GenContext<'a> {
    /// Template content offset in the composite document
    pub block_offset: u32,
    /// Present when the template was rendered from an alternate syntax
    pub mapper: Option<&'a dyn PositionMapper>,
}

/// Transform a template tree into script statements.
pub fn generate_template_code(root: &RootNode, ctx: GenContext<'_>) -> Fragment {
    TemplateCodeGenerator { ctx }.root(root)
}

#[derive(Serialize)]
struct LocJson {
    start: u32,
    end: u32,
}

struct TemplateCodeGenerator<'a> {
    ctx: GenContext<'a>,
}

impl TemplateCodeGenerator<'_> {
    fn root(&self, root: &RootNode) -> Fragment {
        let mut code = Fragment::new();
        for child in root.children.iter().filter(|c| !c.is_whitespace_text()) {
            code.push_str("{\n");
            code.append(self.node(child, false));
            code.push_str("}\n");
        }
        code
    }

    fn node(&self, node: &TemplateChildNode, dont_create_block: bool) -> Fragment {
        match node {
            TemplateChildNode::Element(el) => self.element(el, dont_create_block),
            TemplateChildNode::Interpolation(interp) => self.interpolation(interp),
            TemplateChildNode::Compound(compound) => {
                let mut code = Fragment::new();
                for child in &compound.children {
                    code.append(self.node(child, false));
                }
                code
            }
            TemplateChildNode::If(if_node) => self.if_node(if_node),
            TemplateChildNode::For(for_node) => self.for_node(for_node),
            TemplateChildNode::Text(_) | TemplateChildNode::Comment(_) => Fragment::new(),
        }
    }

    /// Re-resolve template ranges (alternate syntax) and move them into
    /// document coordinates. Unresolvable ranges are dropped.
    fn resolve(&self, search: &str, ranges: &[SourceRange]) -> SmallVec<[SourceRange; 2]> {
        ranges
            .iter()
            .filter_map(|range| {
                let range = match self.ctx.mapper {
                    Some(mapper) => {
                        let start = mapper.map(search, range.start)?;
                        SourceRange::new(start, start + range.len())
                    }
                    None => *range,
                };
                Some(range.shift(self.ctx.block_offset))
            })
            .collect()
    }

    fn mapping(
        &self,
        code: &mut Fragment,
        text: &str,
        search: &str,
        mode: MappingMode,
        capabilities: Capabilities,
        ranges: &[SourceRange],
    ) {
        code.push_mapped(text, &self.resolve(search, ranges), mode, capabilities);
    }

    fn marker(
        &self,
        code: &mut Fragment,
        len: usize,
        search: &str,
        mode: MappingMode,
        capabilities: Capabilities,
        ranges: &[SourceRange],
    ) {
        code.mark(len, &self.resolve(search, ranges), mode, capabilities);
    }

    fn element(&self, el: &ElementNode, dont_create_block: bool) -> Fragment {
        let mut code = Fragment::new();
        if !dont_create_block {
            code.push_str("{\n");
        }

        if el.tag_type == ElementType::Component {
            let tag = el.tag.as_str();
            // +1 skips the '<'
            let start = el.loc.start.offset + 1;
            let start_name = SourceRange::new(start, start + tag.len() as u32);
            let mut names: SmallVec<[SourceRange; 2]> = smallvec![start_name];
            if let Some(end_name) = end_tag_name_range(el) {
                names.push(end_name);
            }
            let nav = Capabilities::template(false, false);

            let lookup_len = "__VLS_components['']".len() + tag.len();
            let bridge = Capabilities::template(true, false);
            self.marker(&mut code, lookup_len, tag, MappingMode::Gate, bridge, &[start_name]);
            code.push_str("__VLS_components[");
            self.marker(&mut code, tag.len() + 2, tag, MappingMode::Gate, nav, &names);
            code.push_str("'");
            self.mapping(&mut code, tag, tag, MappingMode::Offset, nav, &names);
            code.push_str("'] = {\n");
            code.append(self.props(el, true));
            code.push_str("};\n");
        }

        code.append(self.props(el, false));

        for child in &el.children {
            code.append(self.node(child, false));
        }

        if !dont_create_block {
            code.push_str("}\n");
        }
        code
    }

    fn props(&self, el: &ElementNode, in_wrap: bool) -> Fragment {
        let mut code = Fragment::new();
        let nav = Capabilities::template(false, false);
        let editable = Capabilities::template(false, true);

        for prop in &el.props {
            match prop {
                // Static `style` and `class` stay attributes, so every
                // directive expression here is source text, never a constant.
                PropNode::Directive(dir) => {
                    let Some(exp) = dir.exp.as_ref() else {
                        continue;
                    };
                    let value = exp.content.as_str();

                    if !in_wrap {
                        code.push_str("(");
                        let range = SourceRange::at(exp.loc.start.offset, value.len());
                        self.mapping(&mut code, value, value, MappingMode::Offset, editable, &[range]);
                        code.push_str(");\n");
                        continue;
                    }

                    // Component props: bound arguments only
                    match dir.arg.as_ref() {
                        Some(arg) if dir.name == "bind" && arg.is_static => {
                            let name = arg.content.as_str();
                            let range = SourceRange::at(arg.loc.start.offset, name.len());
                            self.marker(&mut code, name.len() + 2, name, MappingMode::Gate, nav, &[range]);
                            code.push_str("'");
                            self.mapping(&mut code, name, name, MappingMode::Offset, nav, &[range]);
                            code.push_str("': (");
                            code.push_str(value);
                            code.push_str("),\n");
                        }
                        _ => {}
                    }
                }
                PropNode::Attribute(attr) => {
                    let Some(value) = attr.value.as_ref() else {
                        continue;
                    };
                    let name = attr.name.as_str();
                    let value_text = value.content.as_str();
                    let name_range = SourceRange::at(attr.loc.start.offset, name.len());
                    // 'test' => test
                    let inner = value.loc.source.find(value_text).unwrap_or(0) as u32;
                    let value_range = SourceRange::at(value.loc.start.offset + inner, value_text.len());

                    if in_wrap {
                        self.marker(&mut code, name.len() + 2, name, MappingMode::Gate, nav, &[name_range]);
                        code.push_str("'");
                        self.mapping(&mut code, name, name, MappingMode::Offset, nav, &[name_range]);
                        code.push_str("': '");
                        code.push_str(value_text);
                        code.push_str("',\n");
                    } else if !value_text.is_empty() {
                        self.marker(
                            &mut code,
                            value_text.len() + 2,
                            value_text,
                            MappingMode::Gate,
                            nav,
                            &[value_range],
                        );
                        code.push_str("'");
                        self.mapping(
                            &mut code,
                            value_text,
                            value_text,
                            MappingMode::Offset,
                            editable,
                            &[value_range],
                        );
                        code.push_str("';\n");
                    }
                }
            }
        }
        code
    }

    fn interpolation(&self, interp: &InterpolationNode) -> Fragment {
        let mut code = Fragment::new();
        let content = interp.content.content.as_str();
        let range = SourceRange::at(interp.content.loc.start.offset, content.len());

        code.push_str("{");
        let editable = Capabilities::template(false, true);
        self.mapping(&mut code, content, content, MappingMode::Offset, editable, &[range]);
        code.push_str("};\n");
        code
    }

    fn if_node(&self, node: &IfNode) -> Fragment {
        let mut code = Fragment::new();
        let editable = Capabilities::template(false, true);
        let mut first_if = true;

        for branch in &node.branches {
            match &branch.condition {
                Some(condition) if !condition.content.trim().is_empty() => {
                    let context = condition.content.as_str();
                    let range = SourceRange::at(condition.loc.start.offset, context.len());
                    code.push_str(if first_if { "if (\n(" } else { "else if (\n(" });
                    first_if = false;
                    self.mapping(&mut code, context, context, MappingMode::Offset, editable, &[range]);
                    code.push_str(")\n) {\n");
                }
                Some(_) => {
                    // The chain cannot continue past an empty condition
                    code.append(self.unprocessed(NodeType::IfBranch, &branch.loc));
                    code.push_str("{\n");
                    first_if = true;
                }
                None => code.push_str(if first_if { "{\n" } else { "else {\n" }),
            }

            for child in &branch.children {
                code.append(self.node(child, !branch.is_template_if));
            }
            code.push_str("}\n");
        }
        code
    }

    fn for_node(&self, node: &ForNode) -> Fragment {
        let mut code = Fragment::new();

        let parsed = node.parse_result.as_ref();
        let (Some(parsed), Some(value)) = (parsed, parsed.and_then(|p| p.value.as_ref())) else {
            code.append(self.unprocessed(NodeType::For, &node.loc));
            for child in &node.children {
                code.append(self.node(child, false));
            }
            return code;
        };

        let source = &parsed.source;
        let plain = Capabilities::template(false, false);
        let source_var = format!("__VLS_{}", source.loc.start.offset);

        code.push_str("const ");
        code.push_str(&source_var);
        code.push_str(" = __VLS_getVforSourceType(");
        let source_range = SourceRange::at(source.loc.start.offset, source.content.len());
        self.mapping(
            &mut code,
            &source.content,
            &source.content,
            MappingMode::Offset,
            plain,
            &[source_range],
        );
        code.push_str(");\n");

        code.push_str("for (__VLS_for_key in ");
        self.mapping(
            &mut code,
            &source_var,
            &source.content,
            MappingMode::Gate,
            Capabilities::template(true, false),
            &[SourceRange::from(&source.loc)],
        );
        code.push_str(") {\n");

        code.push_str("const ");
        let value_range = SourceRange::at(value.loc.start.offset, value.content.len());
        self.mapping(&mut code, &value.content, &value.content, MappingMode::Offset, plain, &[value_range]);
        code.push_str(" = ");
        code.push_str(&source_var);
        code.push_str("[__VLS_for_key];\n");

        if let Some(key) = parsed.key.as_ref() {
            code.push_str("const ");
            let range = SourceRange::at(key.loc.start.offset, key.content.len());
            self.mapping(&mut code, &key.content, &key.content, MappingMode::Offset, plain, &[range]);
            code.push_str(" = 0 as any;\n");
        }
        if let Some(index) = parsed.index.as_ref() {
            code.push_str("const ");
            let range = SourceRange::at(index.loc.start.offset, index.content.len());
            self.mapping(&mut code, &index.content, &index.content, MappingMode::Offset, plain, &[range]);
            code.push_str(" = 0;\n");
        }

        for child in &node.children {
            code.append(self.node(child, !node.is_template_for));
        }
        code.push_str("}\n");
        code
    }

    /// Inert comment standing in for a construct that cannot be generated.
    fn unprocessed(&self, kind: NodeType, loc: &SourceLocation) -> Fragment {
        let json = serde_json::to_string(&LocJson {
            start: loc.start.offset + self.ctx.block_offset,
            end: loc.end.offset + self.ctx.block_offset,
        })
        .unwrap_or_default();
        tracing::debug!(kind = kind.name(), %json, "unprocessed template node");

        let mut code = Fragment::new();
        code.push_str("// Unprocessed node type: ");
        code.push_str(kind.name());
        code.push_str(" json: ");
        code.push_str(&json);
        code.push_str("\n");
        code
    }
}

/// Name range of `</Tag>`, when the element really ends with one.
fn end_tag_name_range(el: &ElementNode) -> Option<SourceRange> {
    if el.is_self_closing {
        return None;
    }
    let source = el.loc.source.as_str();
    let tag = el.tag.as_str();
    let closes = source
        .strip_suffix('>')
        .and_then(|s| s.strip_suffix(tag))
        .is_some_and(|s| s.ends_with("</"));
    if !closes {
        return None;
    }
    let end = el.loc.end.offset - 1;
    Some(SourceRange::new(end - tag.len() as u32, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_armature::parse_template;

    fn generate(template: &str) -> Fragment {
        let (root, _) = parse_template(template);
        generate_template_code(&root, GenContext::default())
    }

    /// Source text covered by every entry whose target text is `target`.
    fn sources_of<'a>(template: &'a str, code: &Fragment, target: &str) -> Vec<&'a str> {
        code.mappings()
            .iter()
            .filter(|m| &code.text()[m.target.start as usize..m.target.end as usize] == target)
            .map(|m| &template[m.source.start as usize..m.source.end as usize])
            .collect()
    }

    #[test]
    fn test_fragment_append_rebases_targets() {
        let mut child = Fragment::new();
        child.push_mapped("abc", &[SourceRange::new(0, 3)], MappingMode::Offset, Capabilities::all());

        let mut parent = Fragment::new();
        parent.push_str("{\n");
        parent.append(child);
        assert_eq!(parent.text(), "{\nabc");
        assert_eq!(parent.mappings()[0].target, SourceRange::new(2, 5));
    }

    #[test]
    fn test_interpolation() {
        let template = "<div>{{ msg }}</div>";
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        {
        { msg };
        }
        }
        ");

        let entry = code.mappings()[0];
        assert_eq!(entry.mode, MappingMode::Offset);
        assert_eq!(&template[entry.source.start as usize..entry.source.end as usize], " msg ");
        assert!(entry.capabilities.contains(Capabilities::FORMATTING));
    }

    #[test]
    fn test_directives_and_static_attributes() {
        let template = r#"<input :value="text" @input="onInput" v-model="model" type="text">"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        {
        (text);
        (onInput);
        (model);
        'text';
        }
        }
        ");
        assert_eq!(sources_of(template, &code, "onInput"), vec!["onInput"]);

        // Static attribute: a Gate over the quoted literal plus an Offset inside it
        let gate = code
            .mappings()
            .iter()
            .find(|m| m.mode == MappingMode::Gate)
            .unwrap();
        assert_eq!(&code.text()[gate.target.start as usize..gate.target.end as usize], "'text'");
        assert_eq!(&template[gate.source.start as usize..gate.source.end as usize], "text");
    }

    #[test]
    fn test_empty_attribute_value_has_no_mapping() {
        let template = r#"<p class="">x</p><MyButton size=""></MyButton>"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        {
        }
        {
        __VLS_components['MyButton'] = {
        'size': '',
        };
        }
        }
        ");
        assert!(code.mappings().iter().all(|m| m.source.start < m.source.end));
        assert!(sources_of(template, &code, "''").is_empty());
    }

    #[test]
    fn test_static_style_stays_a_literal() {
        let template = r#"<p style="z-index: 2" :title="t"></p>"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        {
        'z-index: 2';
        (t);
        }
        }
        ");
        assert_eq!(sources_of(template, &code, "z-index: 2"), vec!["z-index: 2"]);
    }

    #[test]
    fn test_component() {
        let template = r#"<MyButton :label="title" size="lg">{{ n }}</MyButton>"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        {
        __VLS_components['MyButton'] = {
        'label': (title),
        'size': 'lg',
        };
        (title);
        'lg';
        { n };
        }
        }
        ");

        // The bare tag name maps to both the start and the end tag
        assert_eq!(sources_of(template, &code, "MyButton"), vec!["MyButton", "MyButton"]);
        let starts: Vec<_> = code
            .mappings()
            .iter()
            .filter(|m| &code.text()[m.target.start as usize..m.target.end as usize] == "MyButton")
            .map(|m| m.source.start)
            .collect();
        assert_eq!(starts, vec![1, template.rfind("MyButton").unwrap() as u32]);

        // The whole lookup expression is a diagnostic-only bridge
        let bridge = code
            .mappings()
            .iter()
            .find(|m| m.capabilities == Capabilities::DIAGNOSTIC)
            .unwrap();
        assert_eq!(
            &code.text()[bridge.target.start as usize..bridge.target.end as usize],
            "__VLS_components['MyButton']"
        );
    }

    #[test]
    fn test_if_chain() {
        let template = r#"<p v-if="a">1</p><p v-else-if="b">2</p><p v-else>3</p>"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        if (
        (a)
        ) {
        }
        else if (
        (b)
        ) {
        }
        else {
        }
        }
        ");
        assert_eq!(sources_of(template, &code, "a"), vec!["a"]);
        assert_eq!(sources_of(template, &code, "b"), vec!["b"]);
    }

    #[test]
    fn test_template_if_children_get_blocks() {
        let code = generate(r#"<template v-if="ok"><i :id="x"></i></template>"#);
        insta::assert_snapshot!(code.text(), @r"
        {
        if (
        (ok)
        ) {
        {
        (x);
        }
        }
        }
        ");
    }

    #[test]
    fn test_for() {
        let template = r#"<li v-for="(item, index) in items">{{ item }}</li>"#;
        let code = generate(template);
        insta::assert_snapshot!(code.text(), @r"
        {
        const __VLS_28 = __VLS_getVforSourceType(items);
        for (__VLS_for_key in __VLS_28) {
        const item = __VLS_28[__VLS_for_key];
        const index = 0 as any;
        { item };
        }
        }
        ");

        // Each binding maps to its own source range
        assert_eq!(sources_of(template, &code, "items"), vec!["items"]);
        assert_eq!(sources_of(template, &code, "index"), vec!["index"]);
        let item_sources: Vec<_> = code
            .mappings()
            .iter()
            .filter(|m| &code.text()[m.target.start as usize..m.target.end as usize] == "item")
            .map(|m| m.source.start)
            .collect();
        assert_eq!(item_sources, vec![12]);

        // The loop variable bridges back to the whole source expression
        let gate = code
            .mappings()
            .iter()
            .find(|m| m.mode == MappingMode::Gate)
            .unwrap();
        assert_eq!(gate.capabilities, Capabilities::DIAGNOSTIC);
        assert_eq!(&template[gate.source.start as usize..gate.source.end as usize], "items");
    }

    #[test]
    fn test_unparsable_for_is_inert() {
        let code = generate(r#"<li v-for="items">{{ x }}</li>"#);
        insta::assert_snapshot!(code.text(), @r#"
        {
        // Unprocessed node type: For json: {"start":0,"end":30}
        {
        { x };
        }
        }
        "#);
    }

    #[test]
    fn test_empty_condition_breaks_chain() {
        let code = generate(r#"<p v-if="">1</p><p v-else>2</p>"#);
        insta::assert_snapshot!(code.text(), @r#"
        {
        // Unprocessed node type: IfBranch json: {"start":0,"end":16}
        {
        }
        {
        }
        }
        "#);
    }

    #[test]
    fn test_block_offset_shifts_sources() {
        let (root, _) = parse_template("{{ a }}");
        let ctx = GenContext {
            block_offset: 10,
            mapper: None,
        };
        let code = generate_template_code(&root, ctx);
        assert_eq!(code.mappings()[0].source, SourceRange::new(12, 15));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let template = r#"<ul><li v-for="x in xs" :key="x"><Comp v-if="x" :a="x" /></li></ul>"#;
        assert_eq!(generate(template), generate(template));
    }
}
