//! codescope - source-code intelligence for mixed-language repositories.
//!
//! codescope extracts structural symbols and references from source files,
//! scores cyclomatic complexity per function, and builds a module import
//! graph to report fan-out, fan-in and import cycles. Analyses run
//! incrementally: a change to a file re-runs only what it affects.
//!
//! # Architecture
//!
//! - `grammar`: language profiles and the shared grammar/query cache
//! - `parser`: language detection plus query-driven symbol and reference extraction
//! - `analysis`: complexity and coupling analyzers
//! - `runner`: debounced-batch scheduling with per-key supersession
//! - `store`: findings persistence contract and an in-memory store
//! - `walk`: directory walks and ignore rules
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Adding a New Language
//!
//! See `src/grammar/languages/` for examples. Write a `LanguageProfile` and
//! add it to `builtin_profiles()`, or call `GrammarRegistry::register` at
//! runtime.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod grammar;
pub mod model;
pub mod parser;
pub mod report;
pub mod runner;
pub mod store;
pub mod walk;

pub use analysis::{ComplexityAnalyzer, CouplingAnalyzer, FileAnalyzer, ImportGraph, ProjectAnalyzer};
pub use config::Config;
pub use error::{Error, Result};
pub use grammar::{GrammarRegistry, LanguageProfile};
pub use model::{Analyzer, Finding, Reference, ReferenceKind, Severity, Symbol, SymbolKind};
pub use parser::Parser;
pub use runner::{AnalyzerStatus, FileOp, RunKey, RunState, Runner, RunnerOptions, Scope};
pub use store::{FindingStats, FindingsStore, MemoryStore, StatsFilter};
pub use walk::{GlobIgnore, IgnoreMatcher};
