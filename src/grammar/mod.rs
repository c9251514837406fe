//! Grammar registry: per-language profiles plus the cache of loaded grammars,
//! compiled queries and compiled import patterns.
//!
//! A registry is an ordinary value. Build one with
//! [`GrammarRegistry::with_builtins`] at startup and share it as
//! `Arc<GrammarRegistry>`; tests can build isolated registries with
//! [`GrammarRegistry::new`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use tracing::{debug, warn};
use tree_sitter::{Language, Query};

use crate::error::{Error, Result};
use crate::model::SymbolKind;

pub mod languages;

/// Loader returning a linked-in tree-sitter grammar.
pub type GrammarLoader = fn() -> Language;

/// Where an import pattern applies relative to a grouped import block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportContext {
    /// Only outside an import block.
    Single,
    /// Only inside an import block.
    Block,
    /// Anywhere.
    Any,
}

/// A regex that extracts one import target per matching line.
#[derive(Debug, Clone, Copy)]
pub struct ImportPattern {
    pub pattern: &'static str,
    /// Capture group holding the target.
    pub group: usize,
    pub context: ImportContext,
}

impl ImportPattern {
    pub const fn any(pattern: &'static str) -> Self {
        Self {
            pattern,
            group: 1,
            context: ImportContext::Any,
        }
    }

    pub const fn single(pattern: &'static str) -> Self {
        Self {
            pattern,
            group: 1,
            context: ImportContext::Single,
        }
    }

    pub const fn block(pattern: &'static str) -> Self {
        Self {
            pattern,
            group: 1,
            context: ImportContext::Block,
        }
    }
}

/// Start and end markers of grouped import syntax, e.g. Go's `import ( ... )`.
#[derive(Debug, Clone, Copy)]
pub struct ImportBlock {
    pub start: &'static str,
    pub end: &'static str,
}

/// Everything the engine knows about one language.
///
/// Profiles are immutable once registered.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Canonical identifier (e.g. "go", "python").
    pub name: &'static str,
    /// File extensions without the dot, lowercase.
    pub extensions: &'static [&'static str],
    /// Bare filenames such as `Makefile`.
    pub filenames: &'static [&'static str],
    /// Shebang interpreters, without version suffixes.
    pub interpreters: &'static [&'static str],
    pub grammar: Option<GrammarLoader>,
    /// Declarative definition query using `definition.<kind>` and `name` captures.
    pub tag_query: Option<&'static str>,
    /// Declarative reference query using `reference.<kind>` and `name` captures.
    pub ref_query: Option<&'static str>,
    /// Node kinds the hand walk reports when no tag query is usable.
    pub legacy_symbols: &'static [(&'static str, SymbolKind)],
    /// Call-like node kinds the hand walk reports when no reference query is usable.
    pub legacy_calls: &'static [&'static str],
    pub function_node_kinds: &'static [&'static str],
    pub branch_node_kinds: &'static [&'static str],
    /// Branch kinds that only count for `&&`, `||`, `and`, `or`.
    pub boolean_node_kinds: &'static [&'static str],
    pub name_field: &'static str,
    pub comment_kinds: &'static [&'static str],
    pub import_patterns: &'static [ImportPattern],
    pub import_block: Option<ImportBlock>,
    /// Separator of dotted module names (`.` for `pkg.mod`); leading
    /// separators make the import relative to the importer's package.
    /// `None` means import targets are paths.
    pub module_separator: Option<char>,
    /// File stems that stand for their directory (`index`, `__init__`).
    pub index_names: &'static [&'static str],
}

impl LanguageProfile {
    /// A profile with no grammar, no queries and no import patterns.
    pub const fn base(name: &'static str) -> Self {
        Self {
            name,
            extensions: &[],
            filenames: &[],
            interpreters: &[],
            grammar: None,
            tag_query: None,
            ref_query: None,
            legacy_symbols: &[],
            legacy_calls: &["call_expression", "call"],
            function_node_kinds: &[],
            branch_node_kinds: &[],
            boolean_node_kinds: &[],
            name_field: "name",
            comment_kinds: &["comment"],
            import_patterns: &[],
            import_block: None,
            module_separator: None,
            index_names: &["index"],
        }
    }

    pub fn has_grammar(&self) -> bool {
        self.grammar.is_some()
    }

    pub fn is_function_kind(&self, kind: &str) -> bool {
        self.function_node_kinds.contains(&kind)
    }

    pub fn is_branch_kind(&self, kind: &str) -> bool {
        self.branch_node_kinds.contains(&kind)
    }

    pub fn is_boolean_kind(&self, kind: &str) -> bool {
        self.boolean_node_kinds.contains(&kind)
    }

    pub fn is_comment_kind(&self, kind: &str) -> bool {
        self.comment_kinds.contains(&kind)
    }

    pub fn legacy_symbol_kind(&self, node_kind: &str) -> Option<SymbolKind> {
        self.legacy_symbols
            .iter()
            .find(|(kind, _)| *kind == node_kind)
            .map(|(_, symbol_kind)| *symbol_kind)
    }
}

/// A compiled import pattern.
#[derive(Debug)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub group: usize,
    pub context: ImportContext,
}

/// Import patterns of one language, compiled.
#[derive(Debug)]
pub struct CompiledImports {
    pub patterns: Vec<CompiledPattern>,
    /// Compiled `(start, end)` block markers.
    pub block: Option<(Regex, Regex)>,
}

impl CompiledImports {
    fn compile(profile: &LanguageProfile) -> Result<Self> {
        let regex = |pattern: &str| {
            Regex::new(pattern).map_err(|source| Error::Regex {
                language: profile.name.to_string(),
                source,
            })
        };

        let patterns = profile
            .import_patterns
            .iter()
            .map(|p| {
                Ok(CompiledPattern {
                    regex: regex(p.pattern)?,
                    group: p.group,
                    context: p.context,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let block = match profile.import_block {
            Some(block) => Some((regex(block.start)?, regex(block.end)?)),
            None => None,
        };

        Ok(Self { patterns, block })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// A grammar together with its compiled queries.
pub struct LoadedGrammar {
    pub profile: Arc<LanguageProfile>,
    pub language: Language,
    /// `None` when the profile has no tag query or it failed to compile.
    pub tags: Option<Query>,
    pub refs: Option<Query>,
    pub imports: Option<Arc<CompiledImports>>,
}

impl std::fmt::Debug for LoadedGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedGrammar")
            .field("language", &self.profile.name)
            .field("tags", &self.tags.is_some())
            .field("refs", &self.refs.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ProfileTable {
    by_name: BTreeMap<&'static str, Arc<LanguageProfile>>,
    by_extension: HashMap<String, &'static str>,
    by_filename: HashMap<&'static str, &'static str>,
    by_interpreter: HashMap<&'static str, &'static str>,
}

impl ProfileTable {
    fn insert(&mut self, profile: LanguageProfile) {
        let name = profile.name;
        self.by_extension.retain(|_, lang| *lang != name);
        self.by_filename.retain(|_, lang| *lang != name);
        self.by_interpreter.retain(|_, lang| *lang != name);

        for ext in profile.extensions {
            self.by_extension.insert(ext.to_ascii_lowercase(), name);
        }
        for filename in profile.filenames {
            self.by_filename.insert(*filename, name);
        }
        for interpreter in profile.interpreters {
            self.by_interpreter.insert(*interpreter, name);
        }
        self.by_name.insert(name, Arc::new(profile));
    }
}

/// Registry of language profiles and loaded grammars.
#[derive(Default)]
pub struct GrammarRegistry {
    profiles: RwLock<ProfileTable>,
    grammars: Mutex<HashMap<&'static str, Arc<LoadedGrammar>>>,
    imports: Mutex<HashMap<&'static str, Arc<CompiledImports>>>,
}

impl GrammarRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in language profile.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for profile in languages::builtin_profiles() {
            registry.register(profile);
        }
        registry
    }

    /// Add or replace a profile. Cached artifacts for that name are dropped.
    pub fn register(&self, profile: LanguageProfile) {
        let name = profile.name;
        self.profiles.write().insert(profile);
        self.grammars.lock().remove(name);
        self.imports.lock().remove(name);
        debug!(language = name, "registered language profile");
    }

    pub fn profile(&self, name: &str) -> Option<Arc<LanguageProfile>> {
        self.profiles.read().by_name.get(name).cloned()
    }

    /// Registered language names, sorted.
    pub fn languages(&self) -> Vec<&'static str> {
        self.profiles.read().by_name.keys().copied().collect()
    }

    pub fn language_for_extension(&self, ext: &str) -> Option<&'static str> {
        self.profiles
            .read()
            .by_extension
            .get(&ext.to_ascii_lowercase())
            .copied()
    }

    pub fn language_for_filename(&self, filename: &str) -> Option<&'static str> {
        self.profiles.read().by_filename.get(filename).copied()
    }

    pub fn language_for_interpreter(&self, interpreter: &str) -> Option<&'static str> {
        self.profiles.read().by_interpreter.get(interpreter).copied()
    }

    /// Load a grammar and compile its queries, at most once per language.
    ///
    /// The cache lock is held from the lookup through the insert, so racing
    /// first loads compile once and the rest wait for the result.
    pub fn load(&self, name: &str) -> Result<Arc<LoadedGrammar>> {
        let mut grammars = self.grammars.lock();
        if let Some(loaded) = grammars.get(name) {
            return Ok(Arc::clone(loaded));
        }

        let profile = self
            .profile(name)
            .ok_or_else(|| Error::UnknownLanguage(name.to_string()))?;
        let loader = profile
            .grammar
            .ok_or_else(|| Error::NoGrammar(name.to_string()))?;

        let language = loader();
        tree_sitter::Parser::new()
            .set_language(&language)
            .map_err(|e| Error::Grammar {
                language: profile.name.to_string(),
                message: e.to_string(),
            })?;

        let tags = compile_query(&profile, &language, profile.tag_query, "tag");
        let refs = compile_query(&profile, &language, profile.ref_query, "reference");
        let imports = self.import_patterns(name);
        debug!(language = profile.name, "grammar loaded");

        let loaded = Arc::new(LoadedGrammar {
            profile: Arc::clone(&profile),
            language,
            tags,
            refs,
            imports,
        });
        grammars.insert(profile.name, Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Compiled import patterns, available for grammarless languages too.
    ///
    /// Returns `None` for unknown languages and for patterns that fail to compile.
    pub fn import_patterns(&self, name: &str) -> Option<Arc<CompiledImports>> {
        let mut imports = self.imports.lock();
        if let Some(compiled) = imports.get(name) {
            return Some(Arc::clone(compiled));
        }

        let profile = self.profile(name)?;
        let compiled = match CompiledImports::compile(&profile) {
            Ok(compiled) => Arc::new(compiled),
            Err(e) => {
                warn!(language = profile.name, error = %e, "import patterns disabled");
                return None;
            }
        };
        imports.insert(profile.name, Arc::clone(&compiled));
        Some(compiled)
    }
}

fn compile_query(
    profile: &LanguageProfile,
    language: &Language,
    source: Option<&'static str>,
    kind: &'static str,
) -> Option<Query> {
    let source = source?;
    match Query::new(language, source) {
        Ok(query) => Some(query),
        Err(e) => {
            let err = Error::Query {
                language: profile.name.to_string(),
                kind,
                message: e.to_string(),
            };
            warn!(error = %err, "falling back to syntax walk");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn broken_query_profile() -> LanguageProfile {
        LanguageProfile {
            extensions: &["brk"],
            grammar: Some(|| tree_sitter_go::LANGUAGE.into()),
            tag_query: Some("(no_such_node) @definition.function"),
            legacy_symbols: &[("function_declaration", SymbolKind::Function)],
            ..LanguageProfile::base("broken")
        }
    }

    #[test]
    fn test_builtins_are_sorted_and_complete() {
        let registry = GrammarRegistry::with_builtins();
        let names = registry.languages();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        for expected in ["go", "python", "rust", "typescript", "tsx", "ruby", "makefile"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_load_caches_grammar() {
        let registry = GrammarRegistry::with_builtins();
        let first = registry.load("go").unwrap();
        let second = registry.load("go").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.tags.is_some(), "go tag query should compile");
        assert!(first.refs.is_some(), "go reference query should compile");
    }

    static SLOW_LOADS: AtomicUsize = AtomicUsize::new(0);

    fn slow_go() -> Language {
        SLOW_LOADS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        tree_sitter_go::LANGUAGE.into()
    }

    #[test]
    fn test_racing_first_loads_compile_once() {
        let registry = GrammarRegistry::new();
        registry.register(LanguageProfile {
            extensions: &["slowgo"],
            grammar: Some(slow_go),
            tag_query: Some("(function_declaration name: (identifier) @name) @definition.function"),
            ..LanguageProfile::base("slowgo")
        });

        let loaded: Vec<Arc<LoadedGrammar>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.load("slowgo").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(SLOW_LOADS.load(Ordering::SeqCst), 1);
        assert!(loaded.iter().all(|l| Arc::ptr_eq(l, &loaded[0])));
        assert!(loaded[0].tags.is_some());
    }

    #[test]
    fn test_every_builtin_query_compiles() {
        let registry = GrammarRegistry::with_builtins();
        for name in registry.languages() {
            let profile = registry.profile(name).unwrap();
            if !profile.has_grammar() {
                continue;
            }
            let loaded = registry.load(name).unwrap();
            assert_eq!(
                loaded.tags.is_some(),
                profile.tag_query.is_some(),
                "tag query for {}",
                name
            );
            assert_eq!(
                loaded.refs.is_some(),
                profile.ref_query.is_some(),
                "reference query for {}",
                name
            );
        }
    }

    #[test]
    fn test_load_errors() {
        let registry = GrammarRegistry::with_builtins();
        assert!(matches!(
            registry.load("cobol"),
            Err(Error::UnknownLanguage(_))
        ));
        assert!(matches!(registry.load("ruby"), Err(Error::NoGrammar(_))));
    }

    #[test]
    fn test_broken_query_is_dropped() {
        let registry = GrammarRegistry::new();
        registry.register(broken_query_profile());
        let loaded = registry.load("broken").unwrap();
        assert!(loaded.tags.is_none());
    }

    #[test]
    fn test_register_replaces_detection_keys() {
        let registry = GrammarRegistry::new();
        registry.register(broken_query_profile());
        assert_eq!(registry.language_for_extension("BRK"), Some("broken"));

        registry.register(LanguageProfile {
            extensions: &["brk2"],
            ..LanguageProfile::base("broken")
        });
        assert_eq!(registry.language_for_extension("brk"), None);
        assert_eq!(registry.language_for_extension("brk2"), Some("broken"));
    }

    #[test]
    fn test_import_patterns_for_grammarless_language() {
        let registry = GrammarRegistry::with_builtins();
        let imports = registry.import_patterns("ruby").unwrap();
        assert!(!imports.is_empty());
        assert!(registry.import_patterns("cobol").is_none());
    }

    #[test]
    fn test_isolated_registries() {
        let a = GrammarRegistry::new();
        let b = GrammarRegistry::with_builtins();
        assert!(a.languages().is_empty());
        assert!(!b.languages().is_empty());
    }
}
