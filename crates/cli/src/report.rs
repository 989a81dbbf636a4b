//! Output writers: one CSV per classification plus a Markdown validation
//! report. All numbers are rounded here, at the presentation edge; the
//! engine itself never rounds.

use std::path::Path;

use marginflow_engine::model::{CheckStatus, RunResult};

use crate::exit_codes::EXIT_RUNTIME;
use crate::CliError;

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_RUNTIME, message: msg.into(), hint: None }
}

fn money(value: f64, digits: u32) -> String {
    format!("{value:.prec$}", prec = digits as usize)
}

/// Margin percentage rendered as e.g. "23.5%"; blank when revenue is zero.
fn pct(value: Option<f64>) -> String {
    match value {
        Some(p) => format!("{:.1}%", p * 100.0),
        None => String::new(),
    }
}

pub fn write_revenue_centers(
    path: &Path,
    result: &RunResult,
    digits: u32,
) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))?;
    writer
        .write_record([
            "contract_code",
            "project_name",
            "category",
            "allocation_tag",
            "revenue",
            "hours",
            "labor_cost",
            "expense_cost",
            "sga_allocation",
            "data_allocation",
            "workplace_allocation",
            "margin",
            "margin_pct",
        ])
        .map_err(|e| runtime_err(e.to_string()))?;

    for row in &result.revenue_centers {
        writer
            .write_record([
                row.contract_code.as_str(),
                row.project_name.as_str(),
                row.category.as_str(),
                &row.allocation_tag.to_string(),
                &money(row.revenue, digits),
                &money(row.hours, digits),
                &money(row.labor_cost, digits),
                &money(row.expense_cost, digits),
                &money(row.sga_allocation, digits),
                &money(row.data_allocation, digits),
                &money(row.workplace_allocation, digits),
                &money(row.margin, digits),
                &pct(row.margin_pct),
            ])
            .map_err(|e| runtime_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| runtime_err(e.to_string()))
}

pub fn write_cost_centers(path: &Path, result: &RunResult, digits: u32) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))?;
    writer
        .write_record([
            "contract_code",
            "description",
            "pool",
            "hours",
            "labor_cost",
            "expense_cost",
            "total_cost",
        ])
        .map_err(|e| runtime_err(e.to_string()))?;

    for row in &result.cost_centers {
        writer
            .write_record([
                row.contract_code.as_str(),
                row.description.as_str(),
                &row.pool.to_string(),
                &money(row.hours, digits),
                &money(row.labor_cost, digits),
                &money(row.expense_cost, digits),
                &money(row.total_cost, digits),
            ])
            .map_err(|e| runtime_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| runtime_err(e.to_string()))
}

pub fn write_non_revenue_clients(
    path: &Path,
    result: &RunResult,
    digits: u32,
) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))?;
    writer
        .write_record([
            "contract_code",
            "project_name",
            "hours",
            "labor_cost",
            "expense_cost",
            "total_cost",
        ])
        .map_err(|e| runtime_err(e.to_string()))?;

    for row in &result.non_revenue_clients {
        writer
            .write_record([
                row.contract_code.as_str(),
                row.project_name.as_str(),
                &money(row.hours, digits),
                &money(row.labor_cost, digits),
                &money(row.expense_cost, digits),
                &money(row.total_cost, digits),
            ])
            .map_err(|e| runtime_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| runtime_err(e.to_string()))
}

pub fn write_validation_report(
    path: &Path,
    result: &RunResult,
    digits: u32,
) -> Result<(), CliError> {
    let mut report = String::new();
    let meta = &result.meta;

    report.push_str(&format!("# Validation report — {}\n\n", meta.config_name));
    report.push_str(&format!("- Month: {}\n", meta.month));
    report.push_str(&format!("- Engine: {}\n", meta.engine_version));
    report.push_str(&format!("- Run at: {}\n", meta.run_at));
    report.push_str(&format!("- Result: {}\n\n", result.trail.summary()));

    report.push_str("## Checks\n\n");
    report.push_str("| Status | Check | Detail |\n|--------|-------|--------|\n");
    for entry in &result.trail.entries {
        let marker = match entry.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        };
        report.push_str(&format!(
            "| {marker} | {} | {} |\n",
            entry.check,
            entry.detail.replace('|', "\\|")
        ));
    }

    report.push_str("\n## Overhead pools\n\n");
    report.push_str("| Pool | Total | Revenue base | Eligible codes |\n");
    report.push_str("|------|-------|--------------|----------------|\n");
    for pool in &result.pools {
        report.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            pool.name,
            money(pool.total, digits),
            money(pool.revenue_base, digits),
            pool.eligible_codes,
        ));
    }

    report.push_str("\n## Ledger bucketing\n\n");
    report.push_str("| Account | Amount | Bucket | Matched by |\n");
    report.push_str("|---------|--------|--------|------------|\n");
    for account in &result.accounts {
        report.push_str(&format!(
            "| {} | {} | {} | {:?} |\n",
            account.account.replace('|', "\\|"),
            money(account.amount, digits),
            account.bucket,
            account.matched_by,
        ));
    }

    std::fs::write(path, report)
        .map_err(|e| runtime_err(format!("cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginflow_engine::model::{
        AllocationTag, PoolName, RevenueCenterRow, RunMeta, RunResult, ValidationTrail,
    };

    fn result() -> RunResult {
        let mut trail = ValidationTrail::default();
        trail.pass("revenue_total", "matched");
        trail.warn("unmatched_accounts", "1 account defaulted");
        RunResult {
            meta: RunMeta {
                config_name: "test".into(),
                month: "2025-11".into(),
                engine_version: "0.3.0".into(),
                run_at: "2025-12-01T00:00:00Z".into(),
            },
            revenue_centers: vec![RevenueCenterRow {
                contract_code: "X-01".into(),
                project_name: "Alpha".into(),
                category: "Advisory".into(),
                allocation_tag: AllocationTag::Data,
                revenue: 75_000.0,
                hours: 100.0,
                labor_cost: 10_000.004,
                expense_cost: 1_000.0,
                sga_allocation: 6_900.0,
                data_allocation: 11_000.0,
                workplace_allocation: 0.0,
                margin: 46_099.996,
                margin_pct: Some(0.6146666),
            }],
            cost_centers: vec![],
            non_revenue_clients: vec![],
            allocations: vec![],
            pools: vec![marginflow_engine::model::PoolDetail {
                name: PoolName::Sga,
                total: 23_000.0,
                revenue_base: 250_000.0,
                eligible_codes: 3,
            }],
            accounts: vec![],
            trail,
        }
    }

    #[test]
    fn revenue_csv_rounds_at_the_edge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revenue_centers.csv");
        write_revenue_centers(&path, &result(), 2).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().starts_with("contract_code,"));
        let row = lines.next().unwrap();
        assert!(row.contains("10000.00"));
        assert!(row.contains("61.5%"));
    }

    #[test]
    fn zero_revenue_margin_pct_blank() {
        assert_eq!(pct(None), "");
        assert_eq!(pct(Some(0.235)), "23.5%");
    }

    #[test]
    fn markdown_report_lists_every_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation_report.md");
        write_validation_report(&path, &result(), 2).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("PASS: 1 | WARN: 1 | FAIL: 0"));
        assert!(written.contains("| PASS | revenue_total | matched |"));
        assert!(written.contains("| SGA | 23000.00 | 250000.00 | 3 |"));
    }
}
