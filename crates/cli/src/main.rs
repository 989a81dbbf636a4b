// marginflow CLI - monthly cost-waterfall runs from the shell

mod exit_codes;
mod report;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "mflow")]
#[command(about = "Deterministic monthly contract margin analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a month's analysis from a TOML config file
    #[command(after_help = "\
Examples:
  mflow run close.toml --month November2025
  mflow run close.toml --month 2025-11 --expected-revenue 250000
  mflow run close.toml --month 2025-11 --out reports/nov --json")]
    Run {
        /// Path to the close config file
        config: PathBuf,

        /// Reporting month, e.g. 'November2025' or '2025-11'
        #[arg(long)]
        month: String,

        /// Externally supplied month revenue total to reconcile against
        #[arg(long)]
        expected_revenue: Option<f64>,

        /// Directory for the CSV outputs and validation report
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a close config without running
    #[command(after_help = "\
Examples:
  mflow validate close.toml")]
    Validate {
        /// Path to the close config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            eprintln!("Usage: mflow <command> [options]");
            eprintln!("       mflow --help for more information");
            Ok(())
        }
        Some(Commands::Run { config, month, expected_revenue, out, json, output }) => {
            run::cmd_run(config, month, expected_revenue, out, json, output)
        }
        Some(Commands::Validate { config }) => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
