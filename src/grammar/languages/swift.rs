//! Swift language profile. No tag query: symbols come from the syntax walk.

use crate::grammar::{ImportPattern, LanguageProfile};
use crate::model::SymbolKind;

/// `class_declaration` also covers `struct`, `enum` and `extension`.
static LEGACY_SYMBOLS: &[(&str, SymbolKind)] = &[
    ("function_declaration", SymbolKind::Function),
    ("class_declaration", SymbolKind::Class),
    ("protocol_declaration", SymbolKind::Interface),
    ("typealias_declaration", SymbolKind::Type),
];

static IMPORT_PATTERNS: &[ImportPattern] =
    &[ImportPattern::any(r"^\s*(?:@\w+\s+)*import\s+(?:(?:class|struct|enum|protocol|func|var|let|typealias)\s+)?([\w.]+)")];

pub fn profile() -> LanguageProfile {
    LanguageProfile {
        extensions: &["swift"],
        interpreters: &["swift"],
        grammar: Some(|| tree_sitter_swift::LANGUAGE.into()),
        legacy_symbols: LEGACY_SYMBOLS,
        legacy_calls: &["call_expression"],
        function_node_kinds: &["function_declaration", "lambda_literal"],
        branch_node_kinds: &[
            "if_statement",
            "guard_statement",
            "for_statement",
            "while_statement",
            "repeat_while_statement",
            "switch_entry",
            "catch_block",
            "ternary_expression",
            "conjunction_expression",
            "disjunction_expression",
        ],
        comment_kinds: &["comment", "multiline_comment"],
        import_patterns: IMPORT_PATTERNS,
        ..LanguageProfile::base("swift")
    }
}
