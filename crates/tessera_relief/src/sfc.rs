//! Single-file component descriptor.
//!
//! The composite document split into its blocks. Block locations point at
//! the block *content* (between the start tag's `>` and the end tag's `<`).

use rustc_hash::FxHashMap;
use tessera_carton::CompactString;

/// Byte range of a block inside the composite document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockLocation {
    /// Content start offset
    pub start: usize,
    /// Content end offset
    pub end: usize,
    /// Offset of the `<` opening the start tag
    pub tag_start: usize,
    /// Offset just past the end tag's `>`
    pub tag_end: usize,
}

impl BlockLocation {
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }
}

/// `<template>` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfcTemplateBlock {
    pub content: String,
    pub loc: BlockLocation,
    pub lang: Option<CompactString>,
    pub attrs: FxHashMap<CompactString, CompactString>,
}

impl SfcTemplateBlock {
    /// Template language, `html` unless a `lang` attribute says otherwise.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or("html")
    }
}

/// `<script>` or `<script setup>` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfcScriptBlock {
    pub content: String,
    pub loc: BlockLocation,
    pub lang: Option<CompactString>,
    pub setup: bool,
    pub attrs: FxHashMap<CompactString, CompactString>,
}

impl SfcScriptBlock {
    /// Script language, `js` unless a `lang` attribute says otherwise.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or("js")
    }
}

/// `<style>` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfcStyleBlock {
    pub content: String,
    pub loc: BlockLocation,
    pub lang: Option<CompactString>,
    pub scoped: bool,
    pub module: Option<CompactString>,
    pub attrs: FxHashMap<CompactString, CompactString>,
}

impl SfcStyleBlock {
    /// Style language, `css` unless a `lang` attribute says otherwise.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or("css")
    }
}

/// Any other top-level block (`<i18n>`, `<docs>`, ...)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfcCustomBlock {
    pub block_type: CompactString,
    pub content: String,
    pub loc: BlockLocation,
    pub attrs: FxHashMap<CompactString, CompactString>,
}

/// A composite document split into blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfcDescriptor {
    pub source: String,
    pub template: Option<SfcTemplateBlock>,
    pub script: Option<SfcScriptBlock>,
    pub script_setup: Option<SfcScriptBlock>,
    pub styles: Vec<SfcStyleBlock>,
    pub custom_blocks: Vec<SfcCustomBlock>,
}
