//! Rust language profile.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

/// Items inside `impl` and `trait` bodies are methods.
const TAG_QUERY: &str = r#"
(function_item
  name: (identifier) @name) @definition.function

(declaration_list
  (function_item
    name: (identifier) @name) @definition.method)

(declaration_list
  (function_signature_item
    name: (identifier) @name) @definition.method)

(struct_item
  name: (type_identifier) @name) @definition.class

(enum_item
  name: (type_identifier) @name) @definition.type

(union_item
  name: (type_identifier) @name) @definition.type

(type_item
  name: (type_identifier) @name) @definition.type

(trait_item
  name: (type_identifier) @name) @definition.interface

(const_item
  name: (identifier) @name) @definition.constant

(static_item
  name: (identifier) @name) @definition.variable
"#;

const REF_QUERY: &str = r#"
(call_expression
  function: (identifier) @name) @reference.call

(call_expression
  function: (field_expression
    field: (field_identifier) @name)) @reference.call

(call_expression
  function: (scoped_identifier
    name: (identifier) @name)) @reference.call

(macro_invocation
  macro: (identifier) @name) @reference.call

(parameter
  type: (type_identifier) @name) @reference.type_ref

(let_declaration
  type: (type_identifier) @name) @reference.type_ref

(field_declaration
  type: (type_identifier) @name) @reference.type_ref

(reference_type
  type: (type_identifier) @name) @reference.type_ref

(generic_type
  type: (type_identifier) @name) @reference.type_ref

(impl_item
  type: (type_identifier) @name) @reference.type_ref

(struct_expression
  name: (type_identifier) @name) @reference.type_ref

(use_declaration
  argument: (_) @name) @reference.import
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_item", SymbolKind::Function),
    ("struct_item", SymbolKind::Class),
    ("enum_item", SymbolKind::Type),
    ("trait_item", SymbolKind::Interface),
];

static IMPORT_PATTERNS: &[ImportPattern] = &[
    ImportPattern::any(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)"),
    ImportPattern::any(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;"),
    ImportPattern::any(r"^\s*extern\s+crate\s+(\w+)"),
];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["rs"],
        interpreters: &["run-cargo-script"],
        grammar: Some(|| tree_sitter_rust::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression", "macro_invocation"],
        function_node_kinds: &["function_item", "closure_expression"],
        branch_node_kinds: &[
            "if_expression",
            "while_expression",
            "for_expression",
            "match_arm",
            "binary_expression",
        ],
        boolean_node_kinds: &["binary_expression"],
        comment_kinds: &["line_comment", "block_comment"],
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("rust")
    }
}
