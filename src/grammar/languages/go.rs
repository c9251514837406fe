//! Go language profile.

use crate::grammar::{ImportBlock, ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

/// Definitions: functions, methods with receivers, struct/interface/named
/// types, constants and package-level variables.
const TAG_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name) @definition.function

(method_declaration
  name: (field_identifier) @name) @definition.method

(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (struct_type))) @definition.class

(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (interface_type))) @definition.interface

(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (type_identifier))) @definition.type

(type_declaration
  (type_alias
    name: (type_identifier) @name)) @definition.type

(const_declaration
  (const_spec
    name: (identifier) @name)) @definition.constant

(source_file
  (var_declaration
    (var_spec
      name: (identifier) @name)) @definition.variable)
"#;

const REF_QUERY: &str = r#"
(call_expression
  function: (identifier) @name) @reference.call

(call_expression
  function: (selector_expression
    field: (field_identifier) @name)) @reference.call

(parameter_declaration
  type: (type_identifier) @name) @reference.type_ref

(parameter_declaration
  type: (pointer_type (type_identifier) @name)) @reference.type_ref

(field_declaration
  type: (type_identifier) @name) @reference.type_ref

(composite_literal
  type: (type_identifier) @name) @reference.type_ref

(import_spec
  path: (interpreted_string_literal) @name) @reference.import
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_declaration", SymbolKind::Function),
    ("method_declaration", SymbolKind::Method),
];

static IMPORT_PATTERNS: &[ImportPattern] = &[
    ImportPattern::single(r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#),
    ImportPattern::block(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#),
];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["go"],
        grammar: Some(|| tree_sitter_go::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        function_node_kinds: &["function_declaration", "method_declaration", "func_literal"],
        branch_node_kinds: &[
            "if_statement",
            "for_statement",
            "expression_case",
            "type_case",
            "communication_case",
            "binary_expression",
        ],
        boolean_node_kinds: &["binary_expression"],
        import_patterns: IMPORT_PATTERNS,
        import_block: Some(ImportBlock {
            start: r"^\s*import\s*\(\s*$",
            end: r"^\s*\)",
        }),
        ..LanguageProfile::base("go")
    }
}
