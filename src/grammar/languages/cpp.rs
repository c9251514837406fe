//! C++ language profile.

use crate::grammar::LanguageProfile;
use crate::model::SymbolKind;

use super::c;

/// Out-of-line `Type::method` definitions and in-class definitions are methods.
const TAG_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name)) @definition.function

(function_definition
  declarator: (function_declarator
    declarator: (qualified_identifier
      name: (identifier) @name))) @definition.method

(function_definition
  declarator: (function_declarator
    declarator: (field_identifier) @name)) @definition.method

(class_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.class

(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @definition.class

(enum_specifier
  name: (type_identifier) @name
  body: (enumerator_list)) @definition.type

(alias_declaration
  name: (type_identifier) @name) @definition.type

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

(call_expression
  function: (qualified_identifier
    name: (identifier) @name)) @reference.call

(preproc_include
  path: (_) @name) @reference.import
"#;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_definition", SymbolKind::Function),
    ("class_specifier", SymbolKind::Class),
    ("struct_specifier", SymbolKind::Class),
];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        grammar: Some(|| tree_sitter_cpp::LANGUAGE.into()),
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression"],
        function_node_kinds: &["function_definition", "lambda_expression"],
        branch_node_kinds: &[
            "if_statement",
            "for_statement",
            "for_range_loop",
            "while_statement",
            "do_statement",
            "case_statement",
            "catch_clause",
            "conditional_expression",
            "binary_expression",
        ],
        boolean_node_kinds: &["binary_expression"],
        name_field: "declarator",
        import_patterns: c::IMPORT_PATTERNS,
        ..LanguageProfile::base("cpp")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::grammar::GrammarRegistry;
    use crate::model::SymbolKind;
    use crate::parser::Parser;

    fn parser() -> Parser {
        Parser::new(Arc::new(GrammarRegistry::with_builtins()))
    }

    #[test]
    fn test_cpp_symbols() {
        let source = br#"
#include <vector>

class Stack {
public:
    void push(int v) { items.push_back(v); }
private:
    std::vector<int> items;
};

int Stack::size() const {
    return 0;
}

int main() {
    Stack s;
    s.push(1);
    return 0;
}
"#;

        let symbols = parser().parse_symbols(source, "cpp", "stack.cpp");
        let kind_of = |name: &str| symbols.iter().find(|s| s.name == name).map(|s| s.kind);

        assert_eq!(kind_of("Stack"), Some(SymbolKind::Class));
        assert_eq!(kind_of("push"), Some(SymbolKind::Method));
        assert_eq!(kind_of("size"), Some(SymbolKind::Method));
        assert_eq!(kind_of("main"), Some(SymbolKind::Function));
    }
}
