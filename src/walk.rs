//! Directory walks shared by the coupling analyzer and the runner.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Directories skipped by [`GlobIgnore`] regardless of configured patterns.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    "__pycache__",
];

/// Decides which paths a walk or change batch should leave alone.
pub trait IgnoreMatcher: Send + Sync {
    /// Returns `(skip, skip_subtree)`. `skip_subtree` only matters for
    /// directories.
    fn should_skip(&self, path: &Path, is_dir: bool) -> (bool, bool);
}

/// Ignore matcher built from glob patterns plus the default directory list.
///
/// Patterns are matched against the full path, so anchor them with `**/`
/// (`**/generated/**`, `**/*.min.js`).
#[derive(Debug, Clone)]
pub struct GlobIgnore {
    globs: GlobSet,
    include_hidden: bool,
}

impl GlobIgnore {
    pub fn new<S: AsRef<str>>(patterns: &[S], include_hidden: bool) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid ignore pattern {:?}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid ignore patterns: {}", e)))?;
        Ok(Self {
            globs,
            include_hidden,
        })
    }
}

impl Default for GlobIgnore {
    fn default() -> Self {
        Self {
            globs: GlobSet::empty(),
            include_hidden: false,
        }
    }
}

impl IgnoreMatcher for GlobIgnore {
    fn should_skip(&self, path: &Path, is_dir: bool) -> (bool, bool) {
        if is_dir {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            let hidden = name.starts_with('.') && name != "." && name != "..";
            if (hidden && !self.include_hidden) || DEFAULT_SKIP_DIRS.contains(&name.as_ref()) {
                return (true, true);
            }
        }

        if self.globs.is_match(path) {
            return (true, is_dir);
        }
        (false, false)
    }
}

/// Whether a changed file should be ignored.
///
/// The file itself is checked, then each ancestor directory strictly below
/// the deepest root containing it. Roots are never skipped.
pub fn is_ignored(ignore: &dyn IgnoreMatcher, path: &Path, roots: &[PathBuf]) -> bool {
    if ignore.should_skip(path, false).0 {
        return true;
    }

    let Some(root) = roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
    else {
        return false;
    };

    path.ancestors()
        .skip(1)
        .take_while(|dir| *dir != root.as_path() && dir.starts_with(root))
        .any(|dir| ignore.should_skip(dir, true).0)
}

/// Walk `roots` and collect every file accepted by `accept`.
///
/// Roots themselves are never skipped. Walk errors (permissions, broken
/// links) are logged and the walk continues. The result is sorted and
/// free of duplicates.
pub fn collect_files<F>(roots: &[PathBuf], ignore: &dyn IgnoreMatcher, accept: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();

    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_dir();
                let (skip, skip_subtree) = ignore.should_skip(entry.path(), is_dir);
                !(skip && (skip_subtree || !is_dir))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let err = Error::Walk {
                        path: e.path().unwrap_or(root.as_path()).to_path_buf(),
                        source: e,
                    };
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if entry.file_type().is_file() && accept(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    files
}
