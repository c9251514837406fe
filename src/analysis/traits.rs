//! Plug-in points for analyzers driven by the runner.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{Analyzer, Finding};

/// An analyzer whose findings belong to a single file.
///
/// Implementations run on a blocking thread. They should poll `cancel`
/// between expensive steps; whatever they return after cancellation is
/// discarded.
pub trait FileAnalyzer: Send + Sync {
    /// Which analyzer this is. Findings are stored under this name.
    fn analyzer(&self) -> Analyzer;

    fn analyze_file(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<Finding>>;
}

/// An analyzer whose findings cover the whole project.
pub trait ProjectAnalyzer: Send + Sync {
    fn analyzer(&self) -> Analyzer;

    fn analyze_project(&self, roots: &[PathBuf], cancel: &CancellationToken) -> Result<Vec<Finding>>;
}
