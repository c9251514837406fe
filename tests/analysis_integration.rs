//! Integration tests for the complexity and coupling analyzers.
//!
//! Fixtures live under `testdata/complexity` and `testdata/coupling`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codescope::{
    Analyzer, ComplexityAnalyzer, CouplingAnalyzer, FileAnalyzer, GlobIgnore, GrammarRegistry, Parser,
    ProjectAnalyzer, Severity,
};
use tokio_util::sync::CancellationToken;

fn testdata_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

fn parser() -> Arc<Parser> {
    Arc::new(Parser::new(Arc::new(GrammarRegistry::with_builtins())))
}

fn coupling(fan_out: usize, fan_in: usize) -> CouplingAnalyzer {
    let registry = Arc::new(GrammarRegistry::with_builtins());
    let parser = Arc::new(Parser::new(Arc::clone(&registry)));
    CouplingAnalyzer::new(registry, parser, Arc::new(GlobIgnore::default()), fan_out, fan_in)
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// Complexity
// =============================================================================

#[test]
fn test_dispatch_fixture_scores() {
    let path = testdata_path("complexity/dispatch.go");
    let analyzer = ComplexityAnalyzer::new(parser(), 15);

    let findings = analyzer.analyze_path(&path).unwrap();
    assert_eq!(findings.len(), 1, "only Route crosses the threshold");

    let route = &findings[0];
    assert_eq!(route.analyzer, Analyzer::Complexity);
    assert_eq!(route.severity, Severity::Warning);
    assert_eq!(route.category, "go");
    assert_eq!(route.file_path, display(&path));
    assert_eq!(route.line, 9);
    assert_eq!(route.end_line, 44);
    assert_eq!(route.title, "Function 'Route' has cyclomatic complexity 17");
    assert_eq!(route.metadata.get("complexity").map(String::as_str), Some("17"));
    assert_eq!(route.metadata.get("threshold").map(String::as_str), Some("15"));
}

#[test]
fn test_dispatch_fixture_severity_scales_with_threshold() {
    let path = testdata_path("complexity/dispatch.go");

    // 17 < 2 * 9
    let findings = ComplexityAnalyzer::new(parser(), 9).analyze_path(&path).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);

    // 17 >= 2 * 8
    let findings = ComplexityAnalyzer::new(parser(), 8).analyze_path(&path).unwrap();
    assert_eq!(findings[0].severity, Severity::Critical);

    // Trim scores 1 and is reported once the threshold allows it.
    let findings = ComplexityAnalyzer::new(parser(), 1).analyze_path(&path).unwrap();
    let names: Vec<&str> = findings
        .iter()
        .filter_map(|f| f.metadata.get("function").map(String::as_str))
        .collect();
    assert_eq!(names, ["Route", "Trim"]);
}

#[test]
fn test_file_analyzer_trait() {
    let analyzer = ComplexityAnalyzer::new(parser(), 15);
    assert_eq!(FileAnalyzer::analyzer(&analyzer), Analyzer::Complexity);

    let path = testdata_path("complexity/dispatch.go");
    let findings = analyzer.analyze_file(&path, &CancellationToken::new()).unwrap();
    assert_eq!(findings.len(), 1);

    // Straight-line functions stay below the threshold.
    let findings = analyzer
        .analyze_file(&testdata_path("coupling/web/a.js"), &CancellationToken::new())
        .unwrap();
    assert!(findings.is_empty());

    // Files without a grammar produce nothing rather than an error.
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "if and or\n").unwrap();
    assert!(analyzer.analyze_file(&notes, &CancellationToken::new()).unwrap().is_empty());
}

// =============================================================================
// Coupling
// =============================================================================

#[test]
fn test_coupling_fixture_graph() {
    let root = testdata_path("coupling");
    let web = root.join("web");
    let graph = coupling(15, 20).build_graph(&[root.clone()], &CancellationToken::new());

    let a = display(&web.join("a.js"));
    let b = display(&web.join("b.js"));
    let c = display(&web.join("c.js"));
    let standalone = display(&web.join("standalone.js"));
    let main = display(&root.join("main.go"));

    assert_eq!(graph.fan_out(&a), 2);
    assert_eq!(graph.fan_out(&main), 2);
    assert_eq!(graph.fan_in(&b), 2);
    assert!(graph.edges()[&standalone].contains(&b));
    assert!(graph.edges()[&main].contains("fmt"));

    assert_eq!(graph.cycles(50), vec![vec![a, b, c]]);
}

#[test]
fn test_coupling_fixture_findings() {
    let root = testdata_path("coupling");
    let web = root.join("web");
    let analyzer = coupling(2, 2);
    let findings = analyzer
        .analyze_project(&[root.clone()], &CancellationToken::new())
        .unwrap();

    let of = |category: &str| -> Vec<_> { findings.iter().filter(|f| f.category == category).collect() };

    let fan_out: Vec<&str> = of("fan-out").into_iter().map(|f| f.file_path.as_str()).collect();
    assert!(fan_out.contains(&display(&web.join("a.js")).as_str()));
    assert!(fan_out.contains(&display(&root.join("main.go")).as_str()));
    assert!(of("fan-out").iter().all(|f| f.severity == Severity::Warning));

    let fan_in = of("fan-in");
    assert_eq!(fan_in.len(), 1);
    assert_eq!(fan_in[0].file_path, display(&web.join("b.js")));
    assert_eq!(fan_in[0].severity, Severity::Info);
    assert_eq!(fan_in[0].title, "Module is imported by 2 files");

    let cycles = of("cycle");
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].file_path, display(&web.join("a.js")));
    assert_eq!(cycles[0].line, 0);
    assert_eq!(cycles[0].title, "Import cycle between 3 modules");
    assert_eq!(cycles[0].metadata.get("size").map(String::as_str), Some("3"));
}

#[test]
fn test_coupling_respects_roots_and_ignores() {
    let root = testdata_path("coupling");

    // Go alone has no cycles.
    let go_only = coupling(15, 20).build_graph(&[root.join("main.go")], &CancellationToken::new());
    assert_eq!(go_only.edges().len(), 1);
    assert!(go_only.cycles(50).is_empty());

    let registry = Arc::new(GrammarRegistry::with_builtins());
    let parser = Arc::new(Parser::new(Arc::clone(&registry)));
    let ignore = GlobIgnore::new(&["**/web/**"], false).unwrap();
    let analyzer = CouplingAnalyzer::new(registry, parser, Arc::new(ignore), 15, 20);
    let graph = analyzer.build_graph(&[root], &CancellationToken::new());
    assert_eq!(graph.edges().len(), 1);
}
