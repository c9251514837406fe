//! Module-level coupling: import graph, fan-out, fan-in and import cycles.
//!
//! Imports are extracted with per-language regexes rather than the syntax
//! tree, so grammarless languages (shell, ruby, makefiles) take part too.
//! Targets that name another walked file relative to the importer
//! (`./util`, `"util.h"`, `mod util;`) are resolved to that file's path so
//! cycles between files are visible. Everything else stays a raw target.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::grammar::{CompiledImports, GrammarRegistry, ImportContext, LanguageProfile};
use crate::model::{Analyzer, Finding, Severity};
use crate::parser::Parser;
use crate::walk::{collect_files, IgnoreMatcher};

use super::ProjectAnalyzer;

pub const DEFAULT_FAN_OUT_THRESHOLD: usize = 15;
pub const DEFAULT_FAN_IN_THRESHOLD: usize = 20;

/// Upper bound on cycle findings per run.
pub const MAX_CYCLE_FINDINGS: usize = 50;

/// Directed import graph keyed by file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        self.reverse
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    /// File → imported targets.
    pub fn edges(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.edges
    }

    /// Target → importing files.
    pub fn reverse(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.reverse
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn fan_out(&self, file: &str) -> usize {
        self.edges.get(file).map_or(0, BTreeSet::len)
    }

    pub fn fan_in(&self, target: &str) -> usize {
        self.reverse.get(target).map_or(0, BTreeSet::len)
    }

    /// Strongly connected components, found with an iterative Tarjan walk.
    ///
    /// Nodes are the union of `edges` and `reverse` keys. Each component is
    /// sorted, and components are ordered by their first member.
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        let nodes: BTreeSet<&str> = self
            .edges
            .keys()
            .chain(self.reverse.keys())
            .map(String::as_str)
            .collect();
        let successors = |node: &str| self.edges.get(node).into_iter().flatten();

        let mut next_index = 0usize;
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut lowlink: HashMap<&str, usize> = HashMap::new();
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut components = Vec::new();

        for &start in &nodes {
            if index.contains_key(start) {
                continue;
            }

            index.insert(start, next_index);
            lowlink.insert(start, next_index);
            next_index += 1;
            stack.push(start);
            on_stack.insert(start);
            let mut work = vec![(start, successors(start))];

            while let Some((node, children)) = work.last_mut() {
                let node = *node;

                if let Some(child) = children.next() {
                    let child = child.as_str();
                    match index.get(child) {
                        None => {
                            index.insert(child, next_index);
                            lowlink.insert(child, next_index);
                            next_index += 1;
                            stack.push(child);
                            on_stack.insert(child);
                            work.push((child, successors(child)));
                        }
                        Some(&child_index) if on_stack.contains(child) => {
                            let low = lowlink[node].min(child_index);
                            lowlink.insert(node, low);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                work.pop();
                let node_low = lowlink[node];
                if let Some((parent, _)) = work.last() {
                    let low = lowlink[*parent].min(node_low);
                    lowlink.insert(*parent, low);
                }

                if node_low == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(member);
                        component.push(member.to_string());
                        if member == node {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
            }
        }

        components.sort();
        components
    }

    /// Components with more than one member, at most `limit` of them.
    pub fn cycles(&self, limit: usize) -> Vec<Vec<String>> {
        self.strongly_connected_components()
            .into_iter()
            .filter(|component| component.len() > 1)
            .take(limit)
            .collect()
    }
}

/// Extract raw import targets from `content`, one per line at most.
pub fn extract_imports(content: &str, imports: &CompiledImports) -> Vec<String> {
    let mut targets = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        if let Some((start, end)) = &imports.block {
            if !in_block && start.is_match(line) {
                in_block = true;
                continue;
            }
            if in_block && end.is_match(line) {
                in_block = false;
                continue;
            }
        }

        for pattern in &imports.patterns {
            let applies = match pattern.context {
                ImportContext::Single => !in_block,
                ImportContext::Block => in_block,
                ImportContext::Any => true,
            };
            if !applies {
                continue;
            }

            if let Some(target) = pattern
                .regex
                .captures(line)
                .and_then(|captures| captures.get(pattern.group))
            {
                targets.push(target.as_str().to_string());
                break;
            }
        }
    }

    targets
}

/// Project-wide coupling analysis.
pub struct CouplingAnalyzer {
    registry: Arc<GrammarRegistry>,
    parser: Arc<Parser>,
    ignore: Arc<dyn IgnoreMatcher>,
    fan_out_threshold: usize,
    fan_in_threshold: usize,
}

impl CouplingAnalyzer {
    pub fn new(
        registry: Arc<GrammarRegistry>,
        parser: Arc<Parser>,
        ignore: Arc<dyn IgnoreMatcher>,
        fan_out_threshold: usize,
        fan_in_threshold: usize,
    ) -> Self {
        Self {
            registry,
            parser,
            ignore,
            fan_out_threshold,
            fan_in_threshold,
        }
    }

    /// Walk `roots` and build the import graph.
    ///
    /// Unreadable files are skipped. After cancellation the remaining files
    /// are skipped and the partial graph is returned.
    pub fn build_graph(&self, roots: &[PathBuf], cancel: &CancellationToken) -> ImportGraph {
        let files = collect_files(roots, self.ignore.as_ref(), |_| true);
        let known: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();

        let per_file: Vec<(String, Vec<String>)> = files
            .par_iter()
            .filter_map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let language = self.parser.detect_language_for_file(path)?;
                let imports = self.registry.import_patterns(language)?;
                if imports.is_empty() {
                    return None;
                }

                let content = match std::fs::read(path) {
                    Ok(content) => content,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "skipping unreadable file");
                        return None;
                    }
                };
                let content = String::from_utf8_lossy(&content);
                let profile = self.registry.profile(language)?;

                let targets = extract_imports(&content, &imports)
                    .into_iter()
                    .map(|target| {
                        resolve_target(path, &target, &profile, roots, &known).unwrap_or(target)
                    })
                    .collect();
                Some((path.to_string_lossy().into_owned(), targets))
            })
            .collect();

        let mut graph = ImportGraph::new();
        for (file, targets) in per_file {
            for target in targets {
                graph.add_edge(file.clone(), target);
            }
        }
        graph
    }

    /// Fan-out, fan-in and cycle findings for a built graph.
    pub fn findings_for_graph(&self, graph: &ImportGraph) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (file, targets) in graph.edges() {
            let count = targets.len();
            if count < self.fan_out_threshold {
                continue;
            }
            let severity = if count >= self.fan_out_threshold.saturating_mul(2) {
                Severity::Critical
            } else {
                Severity::Warning
            };
            findings.push(
                Finding::new(
                    Analyzer::Coupling,
                    severity,
                    "fan-out",
                    file.as_str(),
                    0,
                    format!("File imports {} modules", count),
                )
                .with_detail(format!(
                    "Imports ({}, threshold {}):\n{}",
                    count,
                    self.fan_out_threshold,
                    bullet_list(targets)
                ))
                .with_metadata("fan_out", count)
                .with_metadata("threshold", self.fan_out_threshold),
            );
        }

        for (target, dependents) in graph.reverse() {
            let count = dependents.len();
            if count < self.fan_in_threshold {
                continue;
            }
            let severity = if count >= self.fan_in_threshold.saturating_mul(2) {
                Severity::Warning
            } else {
                Severity::Info
            };
            findings.push(
                Finding::new(
                    Analyzer::Coupling,
                    severity,
                    "fan-in",
                    target.as_str(),
                    0,
                    format!("Module is imported by {} files", count),
                )
                .with_detail(format!(
                    "Dependents ({}, threshold {}):\n{}",
                    count,
                    self.fan_in_threshold,
                    bullet_list(dependents)
                ))
                .with_metadata("fan_in", count)
                .with_metadata("threshold", self.fan_in_threshold),
            );
        }

        for members in graph.cycles(MAX_CYCLE_FINDINGS) {
            let first = members.first().cloned().unwrap_or_default();
            findings.push(
                Finding::new(
                    Analyzer::Coupling,
                    Severity::Warning,
                    "cycle",
                    first,
                    0,
                    format!("Import cycle between {} modules", members.len()),
                )
                .with_detail(format!("Members:\n{}", bullet_list(&members)))
                .with_metadata("size", members.len())
                .with_metadata("members", members.join(", ")),
            );
        }

        findings
    }

    /// Build the graph for `roots` and report on it.
    pub fn analyze(&self, roots: &[PathBuf], cancel: &CancellationToken) -> Vec<Finding> {
        let graph = self.build_graph(roots, cancel);
        if cancel.is_cancelled() {
            return Vec::new();
        }
        let findings = self.findings_for_graph(&graph);
        info!(
            files = graph.edges().len(),
            findings = findings.len(),
            "coupling analysis finished"
        );
        findings
    }
}

impl ProjectAnalyzer for CouplingAnalyzer {
    fn analyzer(&self) -> Analyzer {
        Analyzer::Coupling
    }

    fn analyze_project(&self, roots: &[PathBuf], cancel: &CancellationToken) -> Result<Vec<Finding>> {
        Ok(self.analyze(roots, cancel))
    }
}

fn bullet_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve `target` to a walked file.
///
/// Path targets are tried against the importer's directory. Dotted module
/// names are tried against the importer's directory and each root, with
/// leading separators climbing from the importer's package. Each base is
/// tried bare, as `base.<ext>` and as `base/<index>.<ext>`.
fn resolve_target(
    importer: &Path,
    target: &str,
    profile: &LanguageProfile,
    roots: &[PathBuf],
    known: &HashSet<&Path>,
) -> Option<String> {
    let dir = importer.parent()?;
    let bases = match profile.module_separator {
        Some(separator) => module_bases(dir, target, separator, roots),
        None => vec![normalize(&dir.join(target))],
    };

    bases
        .iter()
        .flat_map(|base| candidates(base, profile))
        .find(|candidate| candidate != importer && known.contains(candidate.as_path()))
        .map(|candidate| candidate.to_string_lossy().into_owned())
}

fn candidates(base: &Path, profile: &LanguageProfile) -> Vec<PathBuf> {
    let mut candidates = vec![base.to_path_buf()];
    for ext in profile.extensions {
        let mut with_ext = base.as_os_str().to_owned();
        with_ext.push(".");
        with_ext.push(ext);
        candidates.push(PathBuf::from(with_ext));
        for index in profile.index_names {
            candidates.push(base.join(format!("{}.{}", index, ext)));
        }
    }
    candidates
}

/// Directories a dotted module name may live under, most specific first.
fn module_bases(dir: &Path, target: &str, separator: char, roots: &[PathBuf]) -> Vec<PathBuf> {
    let name = target.trim_start_matches(separator);
    let depth = (target.len() - name.len()) / separator.len_utf8();
    let relative: PathBuf = name.split(separator).filter(|part| !part.is_empty()).collect();

    if depth > 0 {
        // `.mod` is a sibling, `..mod` sits one package up.
        let mut package = dir.to_path_buf();
        for _ in 1..depth {
            if !package.pop() {
                return Vec::new();
            }
        }
        return vec![normalize(&package.join(relative))];
    }

    std::iter::once(dir)
        .chain(roots.iter().map(|root| {
            if root.is_file() {
                root.parent().unwrap_or(root)
            } else {
                root.as_path()
            }
        }))
        .map(|base| normalize(&base.join(&relative)))
        .collect()
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::GlobIgnore;

    fn graph(edges: &[(&str, &str)]) -> ImportGraph {
        let mut graph = ImportGraph::new();
        for (from, to) in edges {
            graph.add_edge(*from, *to);
        }
        graph
    }

    fn analyzer(fan_out: usize, fan_in: usize) -> CouplingAnalyzer {
        let registry = Arc::new(GrammarRegistry::with_builtins());
        let parser = Arc::new(Parser::new(Arc::clone(&registry)));
        CouplingAnalyzer::new(registry, parser, Arc::new(GlobIgnore::default()), fan_out, fan_in)
    }

    #[test]
    fn test_three_file_cycle_is_one_component() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(graph.cycles(MAX_CYCLE_FINDINGS), vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = graph(&[("A", "B"), ("A", "C"), ("B", "C"), ("C", "lib")]);
        assert!(graph.cycles(MAX_CYCLE_FINDINGS).is_empty());
        // Sink nodes only present in `reverse` are still visited.
        let components = graph.strongly_connected_components();
        assert!(components.contains(&vec!["lib".to_string()]));
        assert_eq!(components.len(), 4);
    }

    #[test]
    fn test_multiple_cycles_sorted_and_capped() {
        let graph = graph(&[
            ("x", "y"),
            ("y", "x"),
            ("b", "a"),
            ("a", "b"),
            ("a", "m"),
            ("m", "x"),
        ]);
        assert_eq!(graph.cycles(10), vec![vec!["a", "b"], vec!["x", "y"]]);
        assert_eq!(graph.cycles(1), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_self_import_is_not_a_cycle() {
        let graph = graph(&[("a", "a")]);
        assert!(graph.cycles(MAX_CYCLE_FINDINGS).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut graph = ImportGraph::new();
        for i in 0..50_000 {
            graph.add_edge(format!("n{}", i), format!("n{}", i + 1));
        }
        graph.add_edge("n50000", "n0");
        let cycles = graph.cycles(MAX_CYCLE_FINDINGS);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 50_001);
    }

    #[test]
    fn test_fan_out_boundary_is_inclusive() {
        let analyzer = analyzer(3, 100);

        let at = graph(&[("main", "a"), ("main", "b"), ("main", "c")]);
        let findings = analyzer.findings_for_graph(&at);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "fan-out");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].detail, "Imports (3, threshold 3):\n  - a\n  - b\n  - c");

        let below = graph(&[("main", "a"), ("main", "b")]);
        assert!(analyzer.findings_for_graph(&below).is_empty());

        let mut double = ImportGraph::new();
        for target in ["a", "b", "c", "d", "e", "f"] {
            double.add_edge("main", target);
        }
        assert_eq!(analyzer.findings_for_graph(&double)[0].severity, Severity::Critical);
    }

    #[test]
    fn test_fan_in_severity() {
        let analyzer = analyzer(100, 2);

        let at = graph(&[("a", "log"), ("b", "log")]);
        let findings = analyzer.findings_for_graph(&at);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "fan-in");
        assert_eq!(findings[0].file_path, "log");
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].metadata["fan_in"], "2");

        let double = graph(&[("a", "log"), ("b", "log"), ("c", "log"), ("d", "log")]);
        assert_eq!(analyzer.findings_for_graph(&double)[0].severity, Severity::Warning);
    }

    #[test]
    fn test_cycle_findings() {
        let analyzer = analyzer(100, 100);
        let findings = analyzer.findings_for_graph(&graph(&[("b", "a"), ("a", "b")]));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "cycle");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].file_path, "a");
        assert_eq!(findings[0].metadata["members"], "a, b");
    }

    #[test]
    fn test_go_import_block() {
        let registry = GrammarRegistry::with_builtins();
        let imports = registry.import_patterns("go").unwrap();
        let source = r#"package main

import "os"

import (
	"fmt"
	str "strings"
)

var s = "not/an/import"
"#;
        assert_eq!(extract_imports(source, &imports), vec!["os", "fmt", "strings"]);
    }

    #[test]
    fn test_first_pattern_per_line_wins() {
        let registry = GrammarRegistry::with_builtins();
        let imports = registry.import_patterns("javascript").unwrap();
        let source = "import a from './a'; const b = require('./b');\nconst c = require('./c');\n";
        assert_eq!(extract_imports(source, &imports), vec!["./a", "./c"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/p/src/./a/../b")), PathBuf::from("/p/src/b"));
    }

    #[test]
    fn test_build_graph_resolves_relative_imports() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("a.js"), "import { b } from './b';\nimport fs from 'fs';\n").unwrap();
        std::fs::write(root.join("b.js"), "const a = require('./a.js');\n").unwrap();
        std::fs::write(root.join("notes.txt"), "import x from './a';\n").unwrap();

        let analyzer = analyzer(15, 20);
        let graph = analyzer.build_graph(&[root.clone()], &CancellationToken::new());

        let a = root.join("a.js").to_string_lossy().into_owned();
        let b = root.join("b.js").to_string_lossy().into_owned();
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(
            graph.edges()[&a],
            BTreeSet::from([b.clone(), "fs".to_string()])
        );
        assert_eq!(graph.cycles(MAX_CYCLE_FINDINGS), vec![vec![a, b]]);
    }

    #[test]
    fn test_build_graph_resolves_python_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let pkg = root.join("pkg");
        std::fs::create_dir_all(pkg.join("sub")).unwrap();
        std::fs::write(pkg.join("__init__.py"), "").unwrap();
        std::fs::write(pkg.join("a.py"), "from .b import helper\nimport os.path\n").unwrap();
        std::fs::write(pkg.join("b.py"), "import pkg.a\n").unwrap();
        std::fs::write(pkg.join("sub").join("c.py"), "from .. import a\nfrom ..sub.d import thing\n").unwrap();
        std::fs::write(pkg.join("sub").join("d.py"), "from pkg import b\n").unwrap();

        let graph = analyzer(15, 20).build_graph(&[root.clone()], &CancellationToken::new());
        let display = |path: PathBuf| path.to_string_lossy().into_owned();
        let a = display(pkg.join("a.py"));
        let b = display(pkg.join("b.py"));
        let init = display(pkg.join("__init__.py"));

        assert_eq!(graph.edges()[&a], BTreeSet::from([b.clone(), "os.path".to_string()]));
        assert_eq!(graph.edges()[&b], BTreeSet::from([a.clone()]));
        assert_eq!(
            graph.edges()[&display(pkg.join("sub").join("c.py"))],
            BTreeSet::from([init.clone(), display(pkg.join("sub").join("d.py"))])
        );
        // `from pkg import b` names the package, not the submodule.
        assert_eq!(graph.edges()[&display(pkg.join("sub").join("d.py"))], BTreeSet::from([init]));
        assert_eq!(graph.cycles(MAX_CYCLE_FINDINGS), vec![vec![a, b]]);
    }

    #[test]
    fn test_module_bases() {
        let roots = [PathBuf::from("/p")];
        let dir = Path::new("/p/pkg/sub");
        assert_eq!(
            module_bases(dir, "pkg.mod", '.', &roots),
            vec![PathBuf::from("/p/pkg/sub/pkg/mod"), PathBuf::from("/p/pkg/mod")]
        );
        assert_eq!(module_bases(dir, ".mod", '.', &roots), vec![PathBuf::from("/p/pkg/sub/mod")]);
        assert_eq!(module_bases(dir, "..", '.', &roots), vec![PathBuf::from("/p/pkg")]);
        assert_eq!(module_bases(Path::new("/"), "...mod", '.', &roots), Vec::<PathBuf>::new());
    }

    #[test]
    fn test_cancelled_analysis_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "import b\n").unwrap();
        std::fs::write(dir.path().join("b.py"), "import a\n").unwrap();

        let analyzer = analyzer(1, 1);
        let roots = vec![dir.path().to_path_buf()];
        assert!(!analyzer.analyze(&roots, &CancellationToken::new()).is_empty());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(analyzer.analyze(&roots, &cancel).is_empty());
    }
}
