//! Python language profile.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

/// Functions defined directly in a class body (decorated or not) are methods.
const TAG_QUERY: &str = r#"
(class_definition
  name: (identifier) @name) @definition.class

(function_definition
  name: (identifier) @name) @definition.function

(class_definition
  body: (block
    (function_definition
      name: (identifier) @name) @definition.method))

(class_definition
  body: (block
    (decorated_definition
      definition: (function_definition
        name: (identifier) @name) @definition.method)))

(module
  (expression_statement
    (assignment
      left: (identifier) @name)) @definition.variable)
"#;

const REF_QUERY: &str = r#"
(call
  function: (identifier) @name) @reference.call

(call
  function: (attribute
    attribute: (identifier) @name)) @reference.call

(import_statement
  name: (dotted_name) @name) @reference.import

(import_from_statement
  module_name: (dotted_name) @name) @reference.import

(type
  (identifier) @name) @reference.type_ref
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_definition", SymbolKind::Function),
    ("class_definition", SymbolKind::Class),
];

static IMPORT_PATTERNS: &[ImportPattern] = &[
    ImportPattern::any(r"^\s*from\s+([\w.]+)\s+import\b"),
    ImportPattern::any(r"^\s*import\s+([\w.]+)"),
];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["py", "pyi", "pyw"],
        filenames: &["SConstruct", "SConscript"],
        interpreters: &["python"],
        grammar: Some(|| tree_sitter_python::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call"],
        function_node_kinds: &["function_definition", "lambda"],
        branch_node_kinds: &[
            "if_statement",
            "elif_clause",
            "for_statement",
            "while_statement",
            "except_clause",
            "conditional_expression",
            "case_clause",
            "boolean_operator",
        ],
        boolean_node_kinds: &["boolean_operator"],
        import_patterns: IMPORT_PATTERNS,
        module_separator: Some('.'),
        index_names: &["__init__"],
        ..LanguageProfile::base("python")
    }
}
