//! Core records produced by the engine: symbols, references and findings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Kind of a structural definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Constant,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
        }
    }

    /// Parse the suffix of a `definition.<kind>` capture.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "class" | "struct" => Some(SymbolKind::Class),
            "interface" | "trait" => Some(SymbolKind::Interface),
            "type" | "enum" => Some(SymbolKind::Type),
            "variable" | "var" => Some(SymbolKind::Variable),
            "constant" | "const" => Some(SymbolKind::Constant),
            _ => None,
        }
    }

    /// Rank used when two query clauses tag the same node with different kinds.
    /// The more specific kind wins.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            SymbolKind::Method | SymbolKind::Interface => 3,
            SymbolKind::Class => 2,
            SymbolKind::Function | SymbolKind::Type | SymbolKind::Constant => 1,
            SymbolKind::Variable => 0,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a use-site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    TypeRef,
    Import,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Call => "call",
            ReferenceKind::TypeRef => "type_ref",
            ReferenceKind::Import => "import",
        }
    }

    /// Parse the suffix of a `reference.<kind>` capture.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "call" => Some(ReferenceKind::Call),
            "type_ref" | "type" | "class" | "implementation" => Some(ReferenceKind::TypeRef),
            "import" | "module" => Some(ReferenceKind::Import),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named definition extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
    pub file_path: String,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_start_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_end_line: Option<usize>,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// A use-site of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub symbol_name: String,
    pub kind: ReferenceKind,
    pub file_path: String,
    /// 1-indexed.
    pub line: usize,
    /// 1-indexed.
    pub column: usize,
    /// The trimmed source line, at most 120 characters.
    pub context: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Producers of findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analyzer {
    Complexity,
    Coupling,
    Secrets,
    Clones,
}

impl Analyzer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Analyzer::Complexity => "complexity",
            Analyzer::Coupling => "coupling",
            Analyzer::Secrets => "secrets",
            Analyzer::Clones => "clones",
        }
    }
}

impl std::fmt::Display for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Analyzer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complexity" => Ok(Analyzer::Complexity),
            "coupling" => Ok(Analyzer::Coupling),
            "secrets" => Ok(Analyzer::Secrets),
            "clones" => Ok(Analyzer::Clones),
            _ => Err(format!("unknown analyzer: {}", s)),
        }
    }
}

/// Severity levels for findings, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// An issue emitted by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub analyzer: Analyzer,
    pub severity: Severity,
    pub category: String,
    pub file_path: String,
    pub line: usize,
    pub end_line: usize,
    pub title: String,
    pub detail: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    /// Create a finding anchored at a single line.
    pub fn new(
        analyzer: Analyzer,
        severity: Severity,
        category: impl Into<String>,
        file_path: impl Into<String>,
        line: usize,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            analyzer,
            severity,
            category: category.into(),
            file_path: file_path.into(),
            line,
            end_line: line,
            title: title.into(),
            detail: String::new(),
            metadata: BTreeMap::new(),
            accepted: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = end_line;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}
