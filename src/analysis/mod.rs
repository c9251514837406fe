//! Analyzers producing findings.
//!
//! - [`ComplexityAnalyzer`]: per-file cyclomatic complexity from the syntax tree
//! - [`CouplingAnalyzer`]: project-wide import graph, fan-out/fan-in and cycles
//!
//! Both plug into the runner through [`FileAnalyzer`] and [`ProjectAnalyzer`].

pub mod complexity;
pub mod coupling;
mod traits;

pub use complexity::{ComplexityAnalyzer, FunctionComplexity};
pub use coupling::{CouplingAnalyzer, ImportGraph};
pub use traits::{FileAnalyzer, ProjectAnalyzer};
