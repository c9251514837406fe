//! Command-line interface for codescope.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::analysis::{ComplexityAnalyzer, CouplingAnalyzer};
use crate::config::Config;
use crate::grammar::GrammarRegistry;
use crate::parser::Parser as SourceParser;
use crate::report::{self, AnalyzeReport, LanguageRow, OutputFormat};
use crate::runner::Runner;
use crate::store::{FindingsStore, MemoryStore, StatsFilter};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Source-code intelligence for mixed-language repositories.
///
/// codescope extracts symbols and references, scores cyclomatic complexity
/// per function and reports import coupling: fan-out, fan-in and cycles.
#[derive(Parser)]
#[command(name = "codescope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every analyzer over a file or directory
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// List the definitions in a file
    Symbols(FileArgs),
    /// List the use-sites in a file
    References(FileArgs),
    /// List supported languages
    Languages(LanguagesArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Report functions at or above this cyclomatic complexity
    #[arg(long)]
    pub complexity_threshold: Option<u32>,
}

#[derive(Parser)]
pub struct FileArgs {
    /// Source file
    pub file: PathBuf,

    /// Language to parse as (default: detect)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct LanguagesArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, `info` (`-v`) or `debug` (`-vv`).
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the config named on the command line, or discover one near `root`.
fn load_config(explicit: Option<&Path>, root: &Path) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => {
            let config = Config::parse_file(path)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(Config::discover(root)?),
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let config_root = if abs_path.is_dir() {
        abs_path.clone()
    } else {
        abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| abs_path.clone())
    };

    let config = match load_config(args.config.as_deref(), &config_root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let threshold = args
        .complexity_threshold
        .unwrap_or_else(|| config.complexity_threshold());
    if threshold == 0 {
        eprintln!("Error: --complexity-threshold must be at least 1");
        return Ok(EXIT_ERROR);
    }

    let registry = Arc::new(GrammarRegistry::with_builtins());
    let parser = Arc::new(SourceParser::new(Arc::clone(&registry)));
    let ignore = Arc::new(config.ignore_matcher()?);
    let store = Arc::new(MemoryStore::new());

    let runner = Runner::new(
        store.clone(),
        ignore.clone(),
        Arc::clone(&parser),
        config.runner_options(),
    )
    .with_file_analyzer(Arc::new(ComplexityAnalyzer::new(
        Arc::clone(&parser),
        threshold,
    )))
    .with_project_analyzer(Arc::new(CouplingAnalyzer::new(
        registry,
        parser,
        ignore,
        config.fan_out_threshold(),
        config.fan_in_threshold(),
    )));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("analyzing {}", abs_path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let files_scanned = runtime.block_on(async {
        let scheduled = runner.run_all(std::slice::from_ref(&abs_path));
        runner.wait_all().await;
        runner.stop().await;
        scheduled
    });
    spinner.finish_and_clear();

    let filter = StatsFilter::default();
    let report = AnalyzeReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: args.path.to_string_lossy().to_string(),
        files_scanned,
        stats: store.stats(&filter)?,
        findings: store.findings(&filter)?,
        status: runner.status(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_analyze(&mut out, &report, args.format)?;
    out.flush()?;

    if report.has_critical() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Read `args.file` and resolve its language, printing why when it cannot.
fn read_source(args: &FileArgs, parser: &SourceParser) -> anyhow::Result<Option<(Vec<u8>, String)>> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;

    let language = match &args.language {
        Some(name) => {
            if parser.registry().profile(name).is_none() {
                anyhow::bail!("unknown language {:?} (see 'codescope languages')", name);
            }
            name.clone()
        }
        None => match parser.detect_language(&args.file, Some(&content)) {
            Some(name) => name.to_string(),
            None => {
                eprintln!("Warning: unsupported file type: {}", args.file.display());
                return Ok(None);
            }
        },
    };
    Ok(Some((content, language)))
}

/// Run the symbols command.
pub fn run_symbols(args: &FileArgs) -> anyhow::Result<i32> {
    let parser = SourceParser::new(Arc::new(GrammarRegistry::with_builtins()));
    let symbols = match read_source(args, &parser)? {
        Some((content, language)) => {
            parser.parse_symbols(&content, &language, &args.file.to_string_lossy())
        }
        None => Vec::new(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_symbols(&mut out, &symbols, args.format)?;
    Ok(EXIT_SUCCESS)
}

/// Run the references command.
pub fn run_references(args: &FileArgs) -> anyhow::Result<i32> {
    let parser = SourceParser::new(Arc::new(GrammarRegistry::with_builtins()));
    let references = match read_source(args, &parser)? {
        Some((content, language)) => {
            parser.parse_references(&content, &language, &args.file.to_string_lossy())
        }
        None => Vec::new(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_references(&mut out, &references, args.format)?;
    Ok(EXIT_SUCCESS)
}

/// Describe every registered language.
pub fn language_rows(registry: &GrammarRegistry) -> Vec<LanguageRow> {
    registry
        .languages()
        .into_iter()
        .filter_map(|name| registry.profile(name))
        .map(|profile| {
            let support = match (profile.has_grammar(), profile.tag_query.is_some()) {
                (true, true) => "query",
                (true, false) => "syntax walk",
                (false, _) => "imports only",
            };
            LanguageRow {
                name: profile.name.to_string(),
                extensions: profile.extensions.iter().map(|e| e.to_string()).collect(),
                filenames: profile.filenames.iter().map(|f| f.to_string()).collect(),
                support,
            }
        })
        .collect()
}

/// Run the languages command.
pub fn run_languages(args: &LanguagesArgs) -> anyhow::Result<i32> {
    let registry = GrammarRegistry::with_builtins();
    let rows = language_rows(&registry);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_languages(&mut out, &rows, args.format)?;
    Ok(EXIT_SUCCESS)
}
