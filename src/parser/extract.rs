//! Generic query executor and record construction shared by both
//! extraction strategies.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use crate::grammar::LanguageProfile;
use crate::model::{new_id, Reference, ReferenceKind, Symbol, SymbolKind};

/// Longest reference context kept, in characters.
const MAX_CONTEXT_CHARS: usize = 120;

/// A definition node and the name it introduces.
pub(crate) struct SymbolCandidate<'tree> {
    pub node: Node<'tree>,
    pub name: String,
    pub kind: SymbolKind,
}

/// A name token at a use-site.
pub(crate) struct ReferenceCandidate<'tree> {
    pub node: Node<'tree>,
    pub name: String,
    pub kind: ReferenceKind,
}

/// Where the records being built come from.
pub(crate) struct Origin<'a> {
    pub path: &'a str,
    pub profile: &'a LanguageProfile,
    pub created_at: DateTime<Utc>,
}

/// Run a query and pair every `name` capture with every `<prefix><kind>`
/// capture of the same match.
fn paired_captures<'tree, K: Copy>(
    query: &Query,
    root: Node<'tree>,
    source: &[u8],
    prefix: &str,
    parse_kind: fn(&str) -> Option<K>,
) -> Vec<(Node<'tree>, Node<'tree>, K)> {
    let capture_names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);
    let mut pairs = Vec::new();

    while let Some(m) = matches.next() {
        let mut names = Vec::new();
        let mut tagged = Vec::new();

        for capture in m.captures {
            let capture_name = capture_names[capture.index as usize];
            if capture_name == "name" {
                names.push(capture.node);
            } else if let Some(kind) = capture_name.strip_prefix(prefix).and_then(parse_kind) {
                tagged.push((capture.node, kind));
            }
        }

        for &(node, kind) in &tagged {
            for &name_node in &names {
                pairs.push((node, name_node, kind));
            }
        }
    }

    pairs
}

pub(crate) fn tag_candidates<'tree>(
    query: &Query,
    root: Node<'tree>,
    source: &[u8],
) -> Vec<SymbolCandidate<'tree>> {
    paired_captures(query, root, source, "definition.", SymbolKind::parse)
        .into_iter()
        .filter_map(|(node, name_node, kind)| {
            let name = node_name(name_node, source)?;
            Some(SymbolCandidate { node, name, kind })
        })
        .collect()
}

pub(crate) fn reference_candidates<'tree>(
    query: &Query,
    root: Node<'tree>,
    source: &[u8],
) -> Vec<ReferenceCandidate<'tree>> {
    paired_captures(query, root, source, "reference.", ReferenceKind::parse)
        .into_iter()
        .filter_map(|(_, name_node, kind)| {
            let name = node_name(name_node, source)?;
            Some(ReferenceCandidate {
                node: name_node,
                name,
                kind,
            })
        })
        .collect()
}

/// Turn candidates into symbols.
///
/// When several clauses tag the same node with the same name, the most
/// specific kind wins. Remaining duplicates are dropped by `(name, kind)`.
pub(crate) fn build_symbols(
    candidates: Vec<SymbolCandidate<'_>>,
    source: &[u8],
    origin: &Origin<'_>,
) -> Vec<Symbol> {
    let mut by_node: HashMap<(usize, usize, String), usize> = HashMap::new();
    let mut kept: Vec<SymbolCandidate<'_>> = Vec::new();

    for candidate in candidates {
        let key = (
            candidate.node.start_byte(),
            candidate.node.end_byte(),
            candidate.name.clone(),
        );
        match by_node.get(&key) {
            Some(&index) => {
                if candidate.kind.specificity() > kept[index].kind.specificity() {
                    kept[index] = candidate;
                }
            }
            None => {
                by_node.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept.sort_by_key(|c| (c.node.start_byte(), c.node.end_byte()));

    let mut seen = HashSet::new();
    kept.into_iter()
        .filter(|c| seen.insert((c.name.clone(), c.kind)))
        .map(|c| {
            let body = c.node.child_by_field_name("body");
            Symbol {
                id: new_id(),
                signature: signature(c.node, source),
                doc_comment: doc_comment(c.node, source, origin.profile),
                file_path: origin.path.to_string(),
                start_line: c.node.start_position().row + 1,
                end_line: c.node.end_position().row + 1,
                body_start_line: body.map(|b| b.start_position().row + 1),
                body_end_line: body.map(|b| b.end_position().row + 1),
                language: origin.profile.name.to_string(),
                created_at: origin.created_at,
                name: c.name,
                kind: c.kind,
            }
        })
        .collect()
}

/// Turn candidates into references, one per `(line, column, name)`.
pub(crate) fn build_references(
    mut candidates: Vec<ReferenceCandidate<'_>>,
    source: &[u8],
    origin: &Origin<'_>,
) -> Vec<Reference> {
    candidates.sort_by_key(|c| c.node.start_byte());

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|c| {
            let position = c.node.start_position();
            let line = position.row + 1;
            let column = position.column + 1;
            if !seen.insert((line, column, c.name.clone())) {
                return None;
            }
            Some(Reference {
                id: new_id(),
                symbol_name: c.name,
                kind: c.kind,
                file_path: origin.path.to_string(),
                line,
                column,
                context: line_context(source, c.node.start_byte()),
                language: origin.profile.name.to_string(),
                created_at: origin.created_at,
            })
        })
        .collect()
}

/// Text of a name token without surrounding quotes or angle brackets.
pub(crate) fn node_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let name = text
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '<' | '>'));
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Source from the node start up to its body, or the whole node.
pub(crate) fn signature(node: Node<'_>, source: &[u8]) -> String {
    let end = node
        .child_by_field_name("body")
        .map(|body| body.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let text = String::from_utf8_lossy(&source[node.start_byte()..end]);
    text.trim()
        .trim_end_matches(|c: char| c == '{' || c == ':')
        .trim_end()
        .to_string()
}

/// Comment directly above a definition, markers stripped.
///
/// Consecutive comment lines (such as a run of `///`) are joined. Rust
/// attributes between the comment and the item are skipped.
pub(crate) fn doc_comment(node: Node<'_>, source: &[u8], profile: &LanguageProfile) -> Option<String> {
    let mut sibling = node.prev_sibling();
    let mut anchor = node;
    while let Some(attribute) = sibling.filter(|s| s.kind() == "attribute_item") {
        anchor = attribute;
        sibling = attribute.prev_sibling();
    }

    let mut comments = Vec::new();
    while let Some(comment) = sibling {
        if !profile.is_comment_kind(comment.kind()) {
            break;
        }
        if !comments.is_empty() && last_row(comment) + 1 < anchor.start_position().row {
            break;
        }
        comments.push(comment);
        anchor = comment;
        sibling = comment.prev_sibling();
    }

    if comments.is_empty() {
        return None;
    }
    comments.reverse();

    let text = comments
        .iter()
        .filter_map(|c| c.utf8_text(source).ok())
        .map(strip_comment_markers)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Last row holding text; comments that swallow their newline end at column 0
/// of the following row.
fn last_row(node: Node<'_>) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}

pub(crate) fn strip_comment_markers(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut line = line.trim();
            line = line.strip_suffix("*/").unwrap_or(line).trim_end();
            for marker in ["///", "//!", "//", "/**", "/*", "#"] {
                if let Some(rest) = line.strip_prefix(marker) {
                    line = rest;
                    break;
                }
            }
            let line = line.trim_start();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// The trimmed source line containing `byte`, capped at 120 characters.
pub(crate) fn line_context(source: &[u8], byte: usize) -> String {
    let byte = byte.min(source.len());
    let start = source[..byte]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    let end = source[byte..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| byte + p)
        .unwrap_or(source.len());

    String::from_utf8_lossy(&source[start..end])
        .trim()
        .chars()
        .take(MAX_CONTEXT_CHARS)
        .collect()
}

/// Resolve a definition's identifier through the given fields, in order.
///
/// Declarator chains (C/C++) are followed down to the innermost identifier.
pub(crate) fn resolve_name(node: Node<'_>, fields: &[&str], source: &[u8]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| node.child_by_field_name(*field))
        .filter_map(innermost_identifier)
        .find_map(|ident| node_name(ident, source))
}

fn is_identifier(node: Node<'_>) -> bool {
    node.kind().ends_with("identifier") || node.kind() == "name"
}

fn innermost_identifier(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    // Declarator chains are shallow; the bound only guards malformed trees.
    for _ in 0..64 {
        if is_identifier(current) || current.named_child_count() == 0 {
            return Some(current);
        }
        current = current
            .child_by_field_name("declarator")
            .or_else(|| current.child_by_field_name("name"))
            .or_else(|| current.named_child(0))?;
    }
    None
}

/// Rightmost identifier of a callee expression: `a.b.c` resolves to `c`.
pub(crate) fn trailing_identifier(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    for _ in 0..64 {
        if is_identifier(current) {
            return Some(current);
        }
        let count = current.named_child_count();
        if count == 0 {
            return None;
        }
        current = current.named_child(count - 1)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_markers() {
        assert_eq!(strip_comment_markers("/// Adds numbers."), "Adds numbers.");
        assert_eq!(strip_comment_markers("//! Crate docs"), "Crate docs");
        assert_eq!(strip_comment_markers("# python comment"), "python comment");
        assert_eq!(
            strip_comment_markers("/**\n * First line.\n * Second line.\n */"),
            "First line.\nSecond line."
        );
        assert_eq!(strip_comment_markers("/* inline */"), "inline");
    }

    #[test]
    fn test_line_context_is_trimmed_and_capped() {
        let source = b"first\n    let x = call(1);   \nlast";
        assert_eq!(line_context(source, 14), "let x = call(1);");

        let long = format!("    {}\n", "a".repeat(300));
        let context = line_context(long.as_bytes(), 10);
        assert_eq!(context.chars().count(), 120);
    }

    #[test]
    fn test_line_context_at_end_of_input() {
        assert_eq!(line_context(b"only line", 9), "only line");
    }
}
