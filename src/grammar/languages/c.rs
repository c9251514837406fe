//! C language profile.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

const TAG_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name)) @definition.function

(function_definition
  declarator: (pointer_declarator
    declarator: (function_declarator
      declarator: (identifier) @name))) @definition.function

(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.class

(enum_specifier
  name: (type_identifier) @name
  body: (enumerator_list)) @definition.type

(type_definition
  declarator: (type_identifier) @name) @definition.type

(preproc_def
  name: (identifier) @name) @definition.constant
"#;

const REF_QUERY: &str = r#"
(call_expression
  function: (identifier) @name) @reference.call

(call_expression
  function: (field_expression
    field: (field_identifier) @name)) @reference.call

(preproc_include
  path: (_) @name) @reference.import
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_definition", SymbolKind::Function),
    ("struct_specifier", SymbolKind::Class),
];

pub(crate) static IMPORT_PATTERNS: &[ImportPattern] =
    &[ImportPattern::any(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#)];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["c", "h"],
        grammar: Some(|| tree_sitter_c::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression"],
        function_node_kinds: &["function_definition"],
        branch_node_kinds: &[
            "if_statement",
            "for_statement",
            "while_statement",
            "do_statement",
            "case_statement",
            "conditional_expression",
            "binary_expression",
        ],
        boolean_node_kinds: &["binary_expression"],
        name_field: "declarator",
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("c")
    }
}
