//! Scala language profile. No tag query: symbols come from the syntax walk.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_definition", SymbolKind::Function),
    ("class_definition", SymbolKind::Class),
    ("object_definition", SymbolKind::Class),
    ("trait_definition", SymbolKind::Interface),
    ("type_definition", SymbolKind::Type),
];

static IMPORT_PATTERNS: &[ImportPattern] = &[ImportPattern::any(r"^\s*import\s+([\w.]+)")];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["scala", "sc"],
        interpreters: &["scala"],
        grammar: Some(|| tree_sitter_scala::LANGUAGE.into()),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression"],
        function_node_kinds: &["function_definition", "lambda_expression"],
        branch_node_kinds: &[
            "if_expression",
            "while_expression",
            "for_expression",
            "case_clause",
            "catch_clause",
            "infix_expression",
        ],
        boolean_node_kinds: &["infix_expression"],
        comment_kinds: &["comment", "block_comment"],
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("scala")
    }
}
