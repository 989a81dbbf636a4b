//! `mflow run` / `mflow validate` — config-driven monthly cost waterfall.

use std::path::{Path, PathBuf};

use marginflow_engine::engine::{
    load_compensation_csv, load_expenses_csv, load_hours_csv, load_ledger_csv, load_revenue_csv,
};
use marginflow_engine::{EngineConfig, EngineError, EngineInput, ReportingMonth};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_USAGE, EXIT_VALIDATION_FAILURE};
use crate::{report, CliError};

fn cli_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn read_table(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

/// Load the five normalized tables named by the config, relative to the
/// config file's directory.
fn load_input(
    config: &EngineConfig,
    base_dir: &Path,
    month: ReportingMonth,
    expected_revenue: Option<f64>,
) -> Result<EngineInput, CliError> {
    let table_err = |e: EngineError| cli_err(EXIT_RUNTIME, e.to_string());

    Ok(EngineInput {
        revenue: load_revenue_csv(&read_table(&base_dir.join(&config.files.revenue))?)
            .map_err(table_err)?,
        compensation: load_compensation_csv(&read_table(
            &base_dir.join(&config.files.compensation),
        )?)
        .map_err(table_err)?,
        time: load_hours_csv(&read_table(&base_dir.join(&config.files.hours))?)
            .map_err(table_err)?,
        expenses: load_expenses_csv(&read_table(&base_dir.join(&config.files.expenses))?)
            .map_err(table_err)?,
        ledger: load_ledger_csv(&read_table(&base_dir.join(&config.files.ledger))?)
            .map_err(table_err)?,
        month,
        expected_revenue,
    })
}

pub fn cmd_run(
    config_path: PathBuf,
    month: String,
    expected_revenue: Option<f64>,
    out_dir: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = read_table(&config_path)?;
    let config = EngineConfig::from_toml(&config_str)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    let month = ReportingMonth::parse(&month).map_err(|e| cli_err(EXIT_USAGE, e.to_string()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = load_input(&config, base_dir, month, expected_revenue)?;

    let result = marginflow_engine::run(&config, &input).map_err(|e| match e {
        EngineError::Aborted(_) => cli_err(EXIT_VALIDATION_FAILURE, e.to_string()),
        other => cli_err(EXIT_RUNTIME, other.to_string()),
    })?;

    // Only a clean run reaches this point; abort writes nothing.
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot create {}: {e}", out_dir.display())))?;

    let digits = config.numbers.round_digits;
    report::write_revenue_centers(&out_dir.join("revenue_centers.csv"), &result, digits)?;
    report::write_cost_centers(&out_dir.join("cost_centers.csv"), &result, digits)?;
    report::write_non_revenue_clients(&out_dir.join("non_revenue_clients.csv"), &result, digits)?;
    report::write_validation_report(&out_dir.join("validation_report.md"), &result, digits)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    eprintln!(
        "{} — {}: {} revenue centers, {} cost centers, {} non-revenue clients",
        result.meta.config_name,
        result.meta.month,
        result.revenue_centers.len(),
        result.cost_centers.len(),
        result.non_revenue_clients.len(),
    );
    eprintln!("checks: {}", result.trail.summary());
    eprintln!("wrote {}", out_dir.display());

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_table(&config_path)?;
    match EngineConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: '{}' with {} cost center(s), {} account rule(s)",
                config.name,
                config.cost_centers.len(),
                config.account_rules.len(),
            );
            Ok(())
        }
        Err(e) => Err(cli_err(EXIT_INVALID_CONFIG, e.to_string())),
    }
}
