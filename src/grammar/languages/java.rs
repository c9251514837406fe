//! Java language profile.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

const TAG_QUERY: &str = r#"
(class_declaration
  name: (identifier) @name) @definition.class

(record_declaration
  name: (identifier) @name) @definition.class

(interface_declaration
  name: (identifier) @name) @definition.interface

(enum_declaration
  name: (identifier) @name) @definition.type

(method_declaration
  name: (identifier) @name) @definition.method

(constructor_declaration
  name: (identifier) @name) @definition.method

(field_declaration
  declarator: (variable_declarator
    name: (identifier) @name)) @definition.variable
"#;

const REF_QUERY: &str = r#"
(method_invocation
  name: (identifier) @name) @reference.call

(object_creation_expression
  type: (type_identifier) @name) @reference.call

(local_variable_declaration
  type: (type_identifier) @name) @reference.type_ref

(formal_parameter
  type: (type_identifier) @name) @reference.type_ref

(superclass
  (type_identifier) @name) @reference.type_ref

(import_declaration
  (scoped_identifier) @name) @reference.import
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("class_declaration", SymbolKind::Class),
    ("interface_declaration", SymbolKind::Interface),
    ("method_declaration", SymbolKind::Method),
];

static IMPORT_PATTERNS: &[ImportPattern] = &[ImportPattern::any(
    r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;",
)];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["java"],
        grammar: Some(|| tree_sitter_java::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["method_invocation"],
        function_node_kinds: &[
            "method_declaration",
            "constructor_declaration",
            "lambda_expression",
        ],
        branch_node_kinds: &[
            "if_statement",
            "for_statement",
            "enhanced_for_statement",
            "while_statement",
            "do_statement",
            "switch_label",
            "catch_clause",
            "ternary_expression",
            "binary_expression",
        ],
        boolean_node_kinds: &["binary_expression"],
        comment_kinds: &["line_comment", "block_comment"],
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("java")
    }
}
