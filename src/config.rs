//! Configuration file for codescope.
//!
//! Looked up as `.codescope.yaml` or `codescope.yaml` in the project root,
//! then as `config.yaml` in the user's config directory. Every field is
//! optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::complexity::DEFAULT_THRESHOLD;
use crate::analysis::coupling::{DEFAULT_FAN_IN_THRESHOLD, DEFAULT_FAN_OUT_THRESHOLD};
use crate::error::{Error, Result};
use crate::runner::{RunnerOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_STOP_TIMEOUT};
use crate::walk::GlobIgnore;

/// File names searched in the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".codescope.yaml", "codescope.yaml"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub complexity: ComplexityConfig,
    #[serde(default)]
    pub coupling: CouplingConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ComplexityConfig {
    #[serde(default)]
    pub threshold: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CouplingConfig {
    #[serde(default)]
    pub fan_out_threshold: Option<usize>,
    #[serde(default)]
    pub fan_in_threshold: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub stop_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IgnoreConfig {
    /// Glob patterns matched against full paths, e.g. `**/generated/**`.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub include_hidden: Option<bool>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        // An empty file is a valid, all-default config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Find the config file that applies to `root`, if any.
    pub fn find(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
            .or_else(|| {
                ProjectDirs::from("", "", "codescope")
                    .map(|dirs| dirs.config_dir().join("config.yaml"))
                    .filter(|path| path.is_file())
            })
    }

    /// Load and validate the config for `root`, or the defaults if there is
    /// none.
    pub fn discover(root: &Path) -> Result<Self> {
        let config = match Self::find(root) {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                Self::parse_file(&path)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.complexity.threshold == Some(0) {
            return Err(Error::Config("complexity.threshold must be at least 1".into()));
        }
        if self.coupling.fan_out_threshold == Some(0) {
            return Err(Error::Config("coupling.fan_out_threshold must be at least 1".into()));
        }
        if self.coupling.fan_in_threshold == Some(0) {
            return Err(Error::Config("coupling.fan_in_threshold must be at least 1".into()));
        }
        if self.runner.max_concurrency == Some(0) {
            return Err(Error::Config("runner.max_concurrency must be at least 1".into()));
        }
        self.ignore_matcher().map(|_| ())
    }

    pub fn complexity_threshold(&self) -> u32 {
        self.complexity.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn fan_out_threshold(&self) -> usize {
        self.coupling
            .fan_out_threshold
            .unwrap_or(DEFAULT_FAN_OUT_THRESHOLD)
    }

    pub fn fan_in_threshold(&self) -> usize {
        self.coupling
            .fan_in_threshold
            .unwrap_or(DEFAULT_FAN_IN_THRESHOLD)
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            max_concurrency: self
                .runner
                .max_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            stop_timeout: self
                .runner
                .stop_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STOP_TIMEOUT),
        }
    }

    pub fn ignore_matcher(&self) -> Result<GlobIgnore> {
        GlobIgnore::new(
            &self.ignore.patterns,
            self.ignore.include_hidden.unwrap_or(false),
        )
    }
}
