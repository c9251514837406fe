//! Cyclomatic complexity per function.
//!
//! Complexity is calculated as:
//! - Start at 1
//! - Add 1 for each node of a branch kind listed in the language profile
//! - Boolean kinds only count when the operator is `&&`, `||`, `and` or `or`
//!
//! Nested functions are scored on their own and never add to the enclosing
//! function's score.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tree_sitter::Node;

use crate::error::{Error, Result};
use crate::grammar::LanguageProfile;
use crate::model::{Analyzer, Finding, Severity};
use crate::parser::{resolve_name, ParsedSource, Parser};

use super::FileAnalyzer;

/// Default score at which a function is reported.
pub const DEFAULT_THRESHOLD: u32 = 15;

const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "and", "or"];

/// Score of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionComplexity {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub complexity: u32,
}

/// Reports functions whose cyclomatic complexity reaches a threshold.
pub struct ComplexityAnalyzer {
    parser: Arc<Parser>,
    threshold: u32,
}

impl ComplexityAnalyzer {
    pub fn new(parser: Arc<Parser>, threshold: u32) -> Self {
        Self { parser, threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Score every function in a parsed file.
    pub fn analyze_tree(&self, parsed: &ParsedSource, source: &[u8]) -> Vec<FunctionComplexity> {
        score_functions(parsed.root(), source, parsed.profile())
    }

    /// One finding per function with `complexity >= threshold`.
    pub fn findings(
        &self,
        functions: &[FunctionComplexity],
        path: &str,
        language: &str,
    ) -> Vec<Finding> {
        functions
            .iter()
            .filter(|f| f.complexity >= self.threshold)
            .map(|f| {
                let severity = if f.complexity >= self.threshold.saturating_mul(2) {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                Finding::new(
                    Analyzer::Complexity,
                    severity,
                    language,
                    path,
                    f.start_line,
                    format!(
                        "Function '{}' has cyclomatic complexity {}",
                        f.name, f.complexity
                    ),
                )
                .with_end_line(f.end_line)
                .with_detail(format!(
                    "'{}' has {} independent paths (threshold {}). Consider splitting it into smaller functions.",
                    f.name, f.complexity, self.threshold
                ))
                .with_metadata("complexity", f.complexity)
                .with_metadata("threshold", self.threshold)
                .with_metadata("function", &f.name)
                .with_metadata("language", language)
            })
            .collect()
    }

    /// Parse and score in-memory source.
    pub fn analyze_source(&self, content: &[u8], language: &str, path: &str) -> Result<Vec<Finding>> {
        let Some(parsed) = self.parser.try_parse_tree(content, language)? else {
            return Ok(Vec::new());
        };
        let functions = self.analyze_tree(&parsed, content);
        Ok(self.findings(&functions, path, parsed.profile().name))
    }

    /// Read, detect, parse and score a file.
    ///
    /// An unreadable file is an error; unsupported input yields no findings.
    pub fn analyze_path(&self, path: &Path) -> Result<Vec<Finding>> {
        let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let Some(language) = self.parser.detect_language(path, Some(&content)) else {
            return Ok(Vec::new());
        };
        self.analyze_source(&content, language, &path.to_string_lossy())
    }
}

impl FileAnalyzer for ComplexityAnalyzer {
    fn analyzer(&self) -> Analyzer {
        Analyzer::Complexity
    }

    fn analyze_file(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<Finding>> {
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        self.analyze_path(path)
    }
}

/// Score every function-kind node under `root`.
pub fn score_functions(
    root: Node<'_>,
    source: &[u8],
    profile: &LanguageProfile,
) -> Vec<FunctionComplexity> {
    let mut functions = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if profile.is_function_kind(node.kind()) {
            functions.push(FunctionComplexity {
                name: function_name(node, source, profile),
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
                complexity: 1 + decision_points(node, source, profile),
            });
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }

    functions.sort_by(|a, b| {
        a.start_line
            .cmp(&b.start_line)
            .then_with(|| a.name.cmp(&b.name))
    });
    functions
}

/// Decision points inside `function`, excluding nested function bodies.
fn decision_points(function: Node<'_>, source: &[u8], profile: &LanguageProfile) -> u32 {
    let mut count = 0;
    let mut stack = Vec::new();
    let mut cursor = function.walk();
    stack.extend(function.named_children(&mut cursor));

    while let Some(node) = stack.pop() {
        let kind = node.kind();
        if profile.is_function_kind(kind) {
            continue;
        }
        if profile.is_branch_kind(kind)
            && (!profile.is_boolean_kind(kind) || has_logical_operator(node, source))
        {
            count += 1;
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }

    count
}

fn has_logical_operator(node: Node<'_>, source: &[u8]) -> bool {
    if let Some(operator) = node.child_by_field_name("operator") {
        return operator
            .utf8_text(source)
            .map(|text| LOGICAL_OPERATORS.contains(&text.trim()))
            .unwrap_or(false);
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|child| !child.is_named())
        .any(|child| LOGICAL_OPERATORS.contains(&child.kind()));
    found
}

fn function_name(node: Node<'_>, source: &[u8], profile: &LanguageProfile) -> String {
    resolve_name(node, &[profile.name_field, "name", "declarator"], source)
        .unwrap_or_else(|| format!("<anonymous:{}>", node.start_position().row + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarRegistry;

    fn analyzer(threshold: u32) -> ComplexityAnalyzer {
        let parser = Arc::new(Parser::new(Arc::new(GrammarRegistry::with_builtins())));
        ComplexityAnalyzer::new(parser, threshold)
    }

    fn score(source: &str, language: &str) -> Vec<FunctionComplexity> {
        let analyzer = analyzer(DEFAULT_THRESHOLD);
        let parsed = analyzer
            .parser
            .parse_tree(source.as_bytes(), language)
            .expect("source should parse");
        analyzer.analyze_tree(&parsed, source.as_bytes())
    }

    fn complexity_of(functions: &[FunctionComplexity], name: &str) -> u32 {
        functions
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("function {} not scored: {:?}", name, functions))
            .complexity
    }

    #[test]
    fn test_no_branches_scores_one() {
        let functions = score("package main\n\nfunc plain() int {\n\treturn 1\n}\n", "go");
        assert_eq!(complexity_of(&functions, "plain"), 1);
    }

    #[test]
    fn test_single_if_scores_two() {
        let source = r#"package main

func one(x int) int {
	if x > 0 {
		return 1
	}
	return 0
}
"#;
        assert_eq!(complexity_of(&score(source, "go"), "one"), 2);
    }

    #[test]
    fn test_arithmetic_operator_does_not_count() {
        let functions = score("package main\n\nfunc plus(a, b int) int {\n\treturn a + b\n}\n", "go");
        assert_eq!(complexity_of(&functions, "plus"), 1);
    }

    #[test]
    fn test_logical_operators_count() {
        let source = "package main\n\nfunc logic(a, b, c bool) bool {\n\treturn a && b || c\n}\n";
        assert_eq!(complexity_of(&score(source, "go"), "logic"), 3);

        let python = "def check(a, b):\n    if a and b:\n        return 1\n    return 0\n";
        assert_eq!(complexity_of(&score(python, "python"), "check"), 3);
    }

    #[test]
    fn test_nested_functions_scored_separately() {
        let source = r#"package main

func outer() {
	f := func(x int) {
		if x > 0 {
		}
		if x > 1 {
		}
	}
	f(1)
}
"#;
        let functions = score(source, "go");
        assert_eq!(complexity_of(&functions, "outer"), 1);
        assert_eq!(complexity_of(&functions, "<anonymous:4>"), 3);
    }

    #[test]
    fn test_declarator_name_resolution() {
        let source = "int pick(int a, int b) {\n    return a > b ? a : b;\n}\n";
        let functions = score(source, "c");
        assert_eq!(complexity_of(&functions, "pick"), 2);
    }

    #[test]
    fn test_rust_match_arms_and_closures() {
        let source = r#"
fn classify(n: i32) -> &'static str {
    let check = |x: i32| x > 0 && x < 10;
    match n {
        0 => "zero",
        1 => "one",
        _ => "many",
    }
}
"#;
        let functions = score(source, "rust");
        assert_eq!(complexity_of(&functions, "classify"), 4);
        assert_eq!(complexity_of(&functions, "<anonymous:3>"), 2);
    }

    #[test]
    fn test_findings_respect_threshold() {
        let analyzer = analyzer(4);
        let functions = vec![
            FunctionComplexity {
                name: "low".to_string(),
                start_line: 1,
                end_line: 3,
                complexity: 3,
            },
            FunctionComplexity {
                name: "edge".to_string(),
                start_line: 5,
                end_line: 9,
                complexity: 4,
            },
            FunctionComplexity {
                name: "almost".to_string(),
                start_line: 11,
                end_line: 20,
                complexity: 7,
            },
            FunctionComplexity {
                name: "high".to_string(),
                start_line: 22,
                end_line: 40,
                complexity: 8,
            },
        ];

        let findings = analyzer.findings(&functions, "lib.go", "go");
        assert_eq!(findings.len(), 3);

        assert_eq!(findings[0].title, "Function 'edge' has cyclomatic complexity 4");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[1].severity, Severity::Warning);
        assert_eq!(findings[2].severity, Severity::Critical);

        let high = &findings[2];
        assert_eq!(high.analyzer, Analyzer::Complexity);
        assert_eq!(high.category, "go");
        assert_eq!(high.line, 22);
        assert_eq!(high.end_line, 40);
        assert_eq!(high.metadata["complexity"], "8");
        assert_eq!(high.metadata["threshold"], "4");
        assert_eq!(high.metadata["function"], "high");
        assert_eq!(high.metadata["language"], "go");
    }

    #[test]
    fn test_unsupported_input_has_no_findings() {
        let analyzer = analyzer(1);
        assert!(analyzer.analyze_source(b"puts 1", "ruby", "a.rb").unwrap().is_empty());
        assert!(analyzer.analyze_source(b"x", "cobol", "a.cbl").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let analyzer = analyzer(1);
        let err = analyzer
            .analyze_path(Path::new("/nonexistent/codescope/missing.go"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_cancelled_run_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("busy.py");
        std::fs::write(&path, "def f(a):\n    if a:\n        return 1\n").unwrap();

        let analyzer = analyzer(1);
        let cancel = CancellationToken::new();
        assert_eq!(analyzer.analyze_file(&path, &cancel).unwrap().len(), 1);

        cancel.cancel();
        assert!(analyzer.analyze_file(&path, &cancel).unwrap().is_empty());
    }
}
