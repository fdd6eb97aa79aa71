//! Armature - the structural parser framework for tessera.
//!
//! Two entry points:
//!
//! - [`parse_sfc`] splits a composite document into its `<template>`,
//!   `<script>`, `<script setup>`, `<style>` and custom blocks.
//! - [`parse_template`] parses template content into a
//!   [`tessera_relief::RootNode`], lifting `v-if` chains and `v-for`
//!   loops into structural nodes.
//!
//! Neither entry point fails: problems are reported next to the result so
//! that a half-typed document still produces a usable tree.

mod for_expression;
mod parser;
mod sfc;
mod tags;

pub use parser::{parse_template, Parser};
pub use sfc::{parse_sfc, SfcError};
pub use tags::{is_builtin_component, is_native_tag, is_void_tag};
