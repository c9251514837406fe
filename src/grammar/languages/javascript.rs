//! JavaScript language profile.
//!
//! The import patterns and complexity tables are shared with TypeScript.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

const TAG_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name) @definition.function

(generator_function_declaration
  name: (identifier) @name) @definition.function

(class_declaration
  name: (identifier) @name) @definition.class

(method_definition
  name: (property_identifier) @name) @definition.method

(lexical_declaration
  (variable_declarator
    name: (identifier) @name
    value: [(arrow_function) (function_expression)])) @definition.function

(variable_declaration
  (variable_declarator
    name: (identifier) @name
    value: [(arrow_function) (function_expression)])) @definition.function

(program
  (lexical_declaration
    (variable_declarator
      name: (identifier) @name)) @definition.variable)
"#;

const REF_QUERY: &str = r#"
(call_expression
  function: (identifier) @name) @reference.call

(call_expression
  function: (member_expression
    property: (property_identifier) @name)) @reference.call

(new_expression
  constructor: (identifier) @name) @reference.call

(import_statement
  source: (string) @name) @reference.import
"#;

pub(crate) static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_declaration", SymbolKind::Function),
    ("class_declaration", SymbolKind::Class),
    ("method_definition", SymbolKind::Method),
];

pub(crate) static IMPORT_PATTERNS: &[ImportPattern] = &[
    ImportPattern::any(r#"^\s*import\s+(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]"#),
    ImportPattern::any(r#"^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#),
    ImportPattern::any(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#),
];

pub(crate) static FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
];

pub(crate) static BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
    "binary_expression",
];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["js", "jsx", "mjs", "cjs"],
        interpreters: &["node", "nodejs"],
        grammar: Some(|| tree_sitter_javascript::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression", "new_expression"],
        function_node_kinds: FUNCTION_KINDS,
        branch_node_kinds: BRANCH_KINDS,
        boolean_node_kinds: &["binary_expression"],
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("javascript")
    }
}
