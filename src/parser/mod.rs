//! Language detection and symbol/reference extraction.
//!
//! Extraction is declarative where possible: a language's tag and reference
//! queries drive a single generic executor. Languages without a usable query
//! fall back to a syntax walk driven by the profile's node-kind tables.
//!
//! Parse problems never surface as errors. Unsupported input, a missing
//! grammar or a failed parse all produce empty results.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::error::{Error, Result};
use crate::grammar::{GrammarRegistry, LanguageProfile, LoadedGrammar};
use crate::model::{Reference, Symbol};

mod detect;
mod extract;
mod legacy;

pub use detect::{detect_shebang, interpreter_candidates};
pub(crate) use extract::resolve_name;

/// Bytes read when sniffing a shebang from disk.
const SHEBANG_SNIFF_BYTES: u64 = 256;

/// A syntax tree together with the grammar that produced it.
pub struct ParsedSource {
    pub grammar: Arc<LoadedGrammar>,
    pub tree: Tree,
}

impl ParsedSource {
    pub fn profile(&self) -> &LanguageProfile {
        &self.grammar.profile
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Multi-language parser backed by a shared [`GrammarRegistry`].
pub struct Parser {
    registry: Arc<GrammarRegistry>,
}

impl Parser {
    pub fn new(registry: Arc<GrammarRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<GrammarRegistry> {
        &self.registry
    }

    /// Detect a file's language.
    ///
    /// Extension first, then known bare filenames, then (only when content is
    /// given) the shebang line.
    pub fn detect_language(&self, path: &Path, content: Option<&[u8]>) -> Option<&'static str> {
        if let Some(language) = self.detect_from_path(path) {
            return Some(language);
        }
        self.detect_from_shebang(content?)
    }

    /// Like [`detect_language`](Self::detect_language), reading the head of
    /// an extensionless file from disk when the path alone is not enough.
    pub fn detect_language_for_file(&self, path: &Path) -> Option<&'static str> {
        if let Some(language) = self.detect_from_path(path) {
            return Some(language);
        }
        if path.extension().is_some() {
            return None;
        }

        let mut head = Vec::new();
        File::open(path)
            .and_then(|file| file.take(SHEBANG_SNIFF_BYTES).read_to_end(&mut head))
            .ok()?;
        self.detect_from_shebang(&head)
    }

    fn detect_from_path(&self, path: &Path) -> Option<&'static str> {
        let by_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.registry.language_for_extension(ext));
        if by_extension.is_some() {
            return by_extension;
        }

        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.registry.language_for_filename(name))
    }

    fn detect_from_shebang(&self, content: &[u8]) -> Option<&'static str> {
        let interpreter = detect_shebang(content)?;
        interpreter_candidates(&interpreter)
            .iter()
            .find_map(|candidate| self.registry.language_for_interpreter(candidate))
    }

    /// Parse `content` into a tree.
    ///
    /// `Ok(None)` covers unknown languages, grammarless languages and a parser
    /// that gives up. A grammar that fails to load is an error.
    pub fn try_parse_tree(&self, content: &[u8], language: &str) -> Result<Option<ParsedSource>> {
        let grammar = match self.registry.load(language) {
            Ok(grammar) => grammar,
            Err(Error::UnknownLanguage(_)) | Err(Error::NoGrammar(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar.language)
            .map_err(|e| Error::Grammar {
                language: language.to_string(),
                message: e.to_string(),
            })?;

        Ok(parser
            .parse(content, None)
            .map(|tree| ParsedSource { grammar, tree }))
    }

    /// Parse `content`, logging and swallowing any failure.
    pub fn parse_tree(&self, content: &[u8], language: &str) -> Option<ParsedSource> {
        match self.try_parse_tree(content, language) {
            Ok(Some(parsed)) => Some(parsed),
            Ok(None) => {
                debug!(language, "no syntax tree available");
                None
            }
            Err(e) => {
                debug!(language, error = %e, "parse failed");
                None
            }
        }
    }

    /// Extract definitions from `content`.
    pub fn parse_symbols(&self, content: &[u8], language: &str, path: &str) -> Vec<Symbol> {
        let Some(parsed) = self.parse_tree(content, language) else {
            return Vec::new();
        };
        let profile = parsed.profile();
        let root = parsed.root();

        let candidates = match &parsed.grammar.tags {
            Some(query) => extract::tag_candidates(query, root, content),
            None => legacy::symbol_candidates(root, content, profile),
        };

        let origin = extract::Origin {
            path,
            profile,
            created_at: Utc::now(),
        };
        extract::build_symbols(candidates, content, &origin)
    }

    /// Extract use-sites from `content`.
    pub fn parse_references(&self, content: &[u8], language: &str, path: &str) -> Vec<Reference> {
        let Some(parsed) = self.parse_tree(content, language) else {
            return Vec::new();
        };
        let profile = parsed.profile();
        let root = parsed.root();

        let candidates = match &parsed.grammar.refs {
            Some(query) => extract::reference_candidates(query, root, content),
            None => legacy::call_candidates(root, content, profile),
        };

        let origin = extract::Origin {
            path,
            profile,
            created_at: Utc::now(),
        };
        extract::build_references(candidates, content, &origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolKind;

    fn parser() -> Parser {
        Parser::new(Arc::new(GrammarRegistry::with_builtins()))
    }

    #[test]
    fn test_detect_by_extension() {
        let parser = parser();
        assert_eq!(parser.detect_language(Path::new("main.go"), None), Some("go"));
        assert_eq!(parser.detect_language(Path::new("App.TSX"), None), Some("tsx"));
        assert_eq!(parser.detect_language(Path::new("lib.rs"), None), Some("rust"));
        assert_eq!(parser.detect_language(Path::new("notes.txt"), None), None);
    }

    #[test]
    fn test_detect_by_filename() {
        let parser = parser();
        assert_eq!(
            parser.detect_language(Path::new("/src/Makefile"), None),
            Some("makefile")
        );
        assert_eq!(
            parser.detect_language(Path::new("Dockerfile"), None),
            Some("dockerfile")
        );
        assert_eq!(
            parser.detect_language(Path::new("CMakeLists.txt"), None),
            Some("cmake")
        );
        assert_eq!(parser.detect_language(Path::new("Rakefile"), None), Some("ruby"));
    }

    #[test]
    fn test_extension_beats_shebang() {
        let parser = parser();
        let content: &[u8] = b"#!/usr/bin/env ruby\nputs 'hi'\n";
        assert_eq!(
            parser.detect_language(Path::new("script.py"), Some(content)),
            Some("python")
        );
    }

    #[test]
    fn test_shebang_detection() {
        let parser = parser();
        let python3 = parser.detect_language(Path::new("tool"), Some(b"#!/usr/bin/env python3\n".as_slice()));
        let python = parser.detect_language(Path::new("tool"), Some(b"#!/usr/bin/python\n".as_slice()));
        assert_eq!(python3, Some("python"));
        assert_eq!(python3, python);

        assert_eq!(
            parser.detect_language(Path::new("run"), Some(b"#!/bin/bash\nset -e\n".as_slice())),
            Some("shell")
        );
        assert_eq!(parser.detect_language(Path::new("tool"), None), None);
    }

    #[test]
    fn test_unsupported_input_yields_empty() {
        let parser = parser();
        assert!(parser.parse_symbols(b"puts 1", "ruby", "a.rb").is_empty());
        assert!(parser.parse_symbols(b"x", "cobol", "a.cbl").is_empty());
        assert!(parser.parse_references(b"x", "cobol", "a.cbl").is_empty());
        assert!(parser.parse_tree(b"x", "makefile").is_none());
    }

    #[test]
    fn test_symbol_records_are_complete() {
        let parser = parser();
        let source = b"def a():\n    return 1\n\nclass B:\n    pass\n";
        let symbols = parser.parse_symbols(source, "python", "mod.py");

        assert_eq!(symbols.len(), 2);
        for symbol in &symbols {
            assert!(!symbol.id.is_empty());
            assert!(symbol.start_line <= symbol.end_line);
            assert_eq!(symbol.language, "python");
            assert_eq!(symbol.file_path, "mod.py");
        }
        assert_eq!(symbols[0].name, "a");
        assert_eq!(symbols[0].start_line, 1);
        assert_eq!(symbols[0].end_line, 2);
        assert_eq!(symbols[1].kind, SymbolKind::Class);
    }

    #[test]
    fn test_syntax_walk_fallback_when_query_is_broken() {
        let registry = GrammarRegistry::with_builtins();
        let go = registry.profile("go").unwrap();
        registry.register(LanguageProfile {
            tag_query: Some("(not_a_real_node) @definition.function"),
            ref_query: Some("(not_a_real_node) @reference.call"),
            ..(*go).clone()
        });
        let parser = Parser::new(Arc::new(registry));

        let source = b"package main\n\nfunc run() {\n\tstart()\n}\n";
        let symbols = parser.parse_symbols(source, "go", "main.go");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "run");
        assert_eq!(symbols[0].kind, SymbolKind::Function);

        let refs = parser.parse_references(source, "go", "main.go");
        assert!(refs.iter().any(|r| r.symbol_name == "start" && r.line == 4));
    }

    #[test]
    fn test_references_are_deduplicated() {
        let parser = parser();
        let source = b"package main\n\nfunc run() {\n\tstart(); stop()\n\tstart()\n}\n";
        let refs = parser.parse_references(source, "go", "main.go");

        let starts: Vec<_> = refs.iter().filter(|r| r.symbol_name == "start").collect();
        assert_eq!(starts.len(), 2);
        assert_eq!((starts[0].line, starts[0].column), (4, 2));
        assert_eq!((starts[1].line, starts[1].column), (5, 2));
    }
}
