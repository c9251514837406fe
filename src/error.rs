//! Error types for codescope.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the engine.
///
/// Per-file parse problems never surface here: a file that fails to parse
/// yields empty results. These variants cover the failures a caller can act on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("no grammar available for language: {0}")]
    NoGrammar(String),

    #[error("failed to load grammar for {language}: {message}")]
    Grammar { language: String, message: String },

    #[error("failed to compile {kind} query for {language}: {message}")]
    Query {
        language: String,
        kind: &'static str,
        message: String,
    },

    #[error("invalid import pattern for {language}: {source}")]
    Regex {
        language: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("findings store error: {0}")]
    Store(String),

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("analysis task failed: {0}")]
    Task(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "/tmp/missing.go",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/missing.go"), "got: {}", message);
        assert!(message.contains("not found"));
    }

    #[test]
    fn test_query_error_display() {
        let err = Error::Query {
            language: "go".to_string(),
            kind: "tag",
            message: "invalid node type".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to compile tag query for go: invalid node type"
        );
    }
}
