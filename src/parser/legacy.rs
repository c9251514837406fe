//! Syntax walk used when a language has no usable query.
//!
//! Both walks use an explicit work stack so deeply nested or malformed
//! trees cannot exhaust the call stack.

use tree_sitter::Node;

use crate::grammar::LanguageProfile;
use crate::model::ReferenceKind;

use super::extract::{node_name, resolve_name, trailing_identifier, ReferenceCandidate, SymbolCandidate};

/// Fields tried, in order, to find the callee of a call-like node.
const CALLEE_FIELDS: &[&str] = &["function", "name", "macro", "constructor"];

pub(crate) fn symbol_candidates<'tree>(
    root: Node<'tree>,
    source: &[u8],
    profile: &LanguageProfile,
) -> Vec<SymbolCandidate<'tree>> {
    let fields = [profile.name_field, "name"];
    let mut candidates = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(kind) = profile.legacy_symbol_kind(node.kind()) {
            if let Some(name) = resolve_name(node, &fields, source) {
                candidates.push(SymbolCandidate { node, name, kind });
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }

    candidates
}

pub(crate) fn call_candidates<'tree>(
    root: Node<'tree>,
    source: &[u8],
    profile: &LanguageProfile,
) -> Vec<ReferenceCandidate<'tree>> {
    let mut candidates = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if profile.legacy_calls.contains(&node.kind()) {
            let callee = CALLEE_FIELDS
                .iter()
                .find_map(|field| node.child_by_field_name(*field))
                .or_else(|| node.named_child(0));

            if let Some(name_node) = callee.and_then(trailing_identifier) {
                if let Some(name) = node_name(name_node, source) {
                    candidates.push(ReferenceCandidate {
                        node: name_node,
                        name,
                        kind: ReferenceKind::Call,
                    });
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }

    candidates
}
