//! TypeScript and TSX language profiles.

use crate::grammar::LanguageProfile;

use super::javascript;

const TAG_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name) @definition.function

(class_declaration
  name: (type_identifier) @name) @definition.class

(abstract_class_declaration
  name: (type_identifier) @name) @definition.class

(interface_declaration
  name: (type_identifier) @name) @definition.interface

(type_alias_declaration
  name: (type_identifier) @name) @definition.type

(enum_declaration
  name: (identifier) @name) @definition.type

(method_definition
  name: (property_identifier) @name) @definition.method

(lexical_declaration
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

(type_annotation
  (type_identifier) @name) @reference.type_ref

(generic_type
  name: (type_identifier) @name) @reference.type_ref

(import_statement
  source: (string) @name) @reference.import
"#;

fn typescript(name: &'static str) -> LanguageProfile {
    LanguageProfile {
        tag_query: Some(TAG_QUERY),
        ref_query: Some(REF_QUERY),
        legacy_symbols: javascript::LEGACY_SYMBOLS,
        legacy_calls: &["call_expression", "new_expression"],
        function_node_kinds: javascript::FUNCTION_KINDS,
        branch_node_kinds: javascript::BRANCH_KINDS,
        boolean_node_kinds: &["binary_expression"],
        import_patterns: javascript::IMPORT_PATTERNS,
        ..LanguageProfile::base(name)
    }
}

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["ts", "mts", "cts"],
        interpreters: &["ts-node", "deno"],
        grammar: Some(|| tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        ..typescript("typescript")
    }
}

pub fn tsx_profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["tsx"],
        grammar: Some(|| tree_sitter_typescript::LANGUAGE_TSX.into()),
        ..typescript("tsx")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::grammar::GrammarRegistry;
    use crate::model::{ReferenceKind, SymbolKind};
    use crate::parser::Parser;

    fn parser() -> Parser {
        Parser::new(Arc::new(GrammarRegistry::with_builtins()))
    }

    #[test]
    fn test_typescript_symbols() {
        let source = br#"
export interface User {
  id: string;
}

type UserId = string;

enum Role { Admin, Guest }

export class UserService {
  find(id: UserId): User | undefined {
    return undefined;
  }
}

export function createService(): UserService {
  return new UserService();
}
"#;

        let symbols = parser().parse_symbols(source, "typescript", "user.ts");
        let kind_of = |name: &str| symbols.iter().find(|s| s.name == name).map(|s| s.kind);

        assert_eq!(kind_of("User"), Some(SymbolKind::Interface));
        assert_eq!(kind_of("UserId"), Some(SymbolKind::Type));
        assert_eq!(kind_of("Role"), Some(SymbolKind::Type));
        assert_eq!(kind_of("UserService"), Some(SymbolKind::Class));
        assert_eq!(kind_of("find"), Some(SymbolKind::Method));
        assert_eq!(kind_of("createService"), Some(SymbolKind::Function));
        assert!(symbols.iter().all(|s| s.language == "typescript"));
    }

    #[test]
    fn test_tsx_symbols() {
        let source = br#"
export function App(props: Props) {
  return <div>{props.title}</div>;
}
"#;

        let symbols = parser().parse_symbols(source, "tsx", "App.tsx");
        assert!(symbols
            .iter()
            .any(|s| s.name == "App" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn test_typescript_type_references() {
        let source = br#"
import { Injectable } from "./di";

function load(repo: Repository): Promise<User> {
  return repo.fetch();
}
"#;

        let refs = parser().parse_references(source, "typescript", "load.ts");
        let has = |name: &str, kind: ReferenceKind| {
            refs.iter().any(|r| r.symbol_name == name && r.kind == kind)
        };

        assert!(has("./di", ReferenceKind::Import));
        assert!(has("Repository", ReferenceKind::TypeRef));
        assert!(has("Promise", ReferenceKind::TypeRef));
        assert!(has("fetch", ReferenceKind::Call));
    }
}
