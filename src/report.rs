//! Output formatting for codescope results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use std::io::{self, Write};

use colored::*;
use serde::Serialize;

use crate::model::{Finding, Reference, Severity, Symbol};
use crate::runner::{AnalyzerStatus, RunState};
use crate::store::FindingStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Result of a one-shot analysis.
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub version: String,
    pub path: String,
    pub files_scanned: usize,
    pub stats: FindingStats,
    pub findings: Vec<Finding>,
    pub status: Vec<AnalyzerStatus>,
}

impl AnalyzeReport {
    pub fn has_critical(&self) -> bool {
        self.stats.count(Severity::Critical) > 0
    }
}

/// How a language is supported, for `codescope languages`.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageRow {
    pub name: String,
    pub extensions: Vec<String>,
    pub filenames: Vec<String>,
    pub support: &'static str,
}

fn write_json_value<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

// =============================================================================
// Analyze
// =============================================================================

pub fn write_analyze<W: Write>(out: &mut W, report: &AnalyzeReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json_value(out, report),
        OutputFormat::Pretty => write_analyze_pretty(out, report),
    }
}

fn write_analyze_pretty<W: Write>(out: &mut W, report: &AnalyzeReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {} v{}", "codescope".cyan().bold(), report.version)?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Analyzing: ".dimmed(), report.path)?;
    writeln!(out, "  {}{}", "Files:     ".dimmed(), report.files_scanned)?;
    writeln!(out)?;

    if report.findings.is_empty() {
        writeln!(out, "  {}", "✓ No findings".green())?;
    } else {
        for finding in &report.findings {
            write_finding(out, finding)?;
        }
    }
    writeln!(out)?;

    writeln!(
        out,
        "  Summary: {} findings ({} critical, {} warning, {} info)",
        report.stats.total,
        report.stats.count(Severity::Critical),
        report.stats.count(Severity::Warning),
        report.stats.count(Severity::Info)
    )?;

    if !report.status.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", "Analyzers:".bold())?;
        for status in &report.status {
            write_status(out, status)?;
        }
    }
    writeln!(out)
}

fn write_finding<W: Write>(out: &mut W, finding: &Finding) -> io::Result<()> {
    let location = if finding.line == 0 {
        finding.file_path.clone()
    } else {
        format!("{}:{}", finding.file_path, finding.line)
    };

    writeln!(
        out,
        "  {}  {}  {}  {}",
        colored_severity(finding.severity),
        location.bold(),
        finding.title,
        format!("[{}/{}]", finding.analyzer, finding.category).dimmed()
    )?;
    for line in finding.detail.lines().filter(|l| !l.trim().is_empty()) {
        writeln!(out, "      {}", line.dimmed())?;
    }
    Ok(())
}

fn colored_severity(severity: Severity) -> ColoredString {
    let label = format!("{:<8}", severity.to_string().to_uppercase());
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::Warning => label.yellow(),
        Severity::Info => label.blue(),
    }
}

fn write_status<W: Write>(out: &mut W, status: &AnalyzerStatus) -> io::Result<()> {
    let state = format!("{:<8}", status.state);
    let state = match status.state {
        RunState::Idle => state.green(),
        RunState::Running => state.yellow(),
        RunState::Error => state.red(),
    };
    let duration = status
        .last_duration_ms
        .map(|ms| format!("{}ms", ms))
        .unwrap_or_else(|| "-".to_string());

    write!(
        out,
        "    {:<12} {} {:>5} findings  {}",
        status.analyzer.as_str(),
        state,
        status.finding_count,
        duration.dimmed()
    )?;
    if let Some(err) = &status.last_error {
        write!(out, "  {}", err.red())?;
    }
    writeln!(out)
}

// =============================================================================
// Symbols and references
// =============================================================================

pub fn write_symbols<W: Write>(out: &mut W, symbols: &[Symbol], format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json_value(out, &symbols);
    }

    if symbols.is_empty() {
        return writeln!(out, "  {}", "No symbols found".dimmed());
    }
    for symbol in symbols {
        writeln!(
            out,
            "  {:<10} {}  {}",
            symbol.kind.as_str().cyan(),
            symbol.name.bold(),
            format!("{}:{}-{}", symbol.file_path, symbol.start_line, symbol.end_line).dimmed()
        )?;
        if !symbol.signature.is_empty() && symbol.signature != symbol.name {
            writeln!(out, "             {}", symbol.signature)?;
        }
        if let Some(doc) = &symbol.doc_comment {
            if let Some(first) = doc.lines().next() {
                writeln!(out, "             {}", first.dimmed())?;
            }
        }
    }
    Ok(())
}

pub fn write_references<W: Write>(
    out: &mut W,
    references: &[Reference],
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json_value(out, &references);
    }

    if references.is_empty() {
        return writeln!(out, "  {}", "No references found".dimmed());
    }
    for reference in references {
        writeln!(
            out,
            "  {:>5}:{:<4} {:<9} {}  {}",
            reference.line,
            reference.column,
            reference.kind.as_str(),
            reference.symbol_name.bold(),
            reference.context.dimmed()
        )?;
    }
    Ok(())
}

pub fn write_languages<W: Write>(out: &mut W, rows: &[LanguageRow], format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json_value(out, &rows);
    }

    for row in rows {
        let mut keys: Vec<String> = row.extensions.iter().map(|e| format!(".{}", e)).collect();
        keys.extend(row.filenames.iter().cloned());
        writeln!(
            out,
            "  {:<12} {:<20} {}",
            row.name.bold(),
            row.support,
            keys.join(" ").dimmed()
        )?;
    }
    Ok(())
}
