//! codescope CLI entry point.

use clap::Parser;
use codescope::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Analyze(args) => cli::run_analyze(args),
        Commands::Symbols(args) => cli::run_symbols(args),
        Commands::References(args) => cli::run_references(args),
        Commands::Languages(args) => cli::run_languages(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
