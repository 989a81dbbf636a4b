use std::collections::BTreeMap;

use crate::aggregate::aggregate_revenue;
use crate::allocate::allocate;
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::costs::compute_direct_costs;
use crate::error::{EngineError, Fatal};
use crate::margins::build_revenue_center_rows;
use crate::model::{
    AllocationTag, Billable, CompensationRow, CostCenterRow, EngineInput, ExpenseEntry, LedgerRow,
    NonRevenueRow, RateSource, RevenueRow, RunMeta, RunResult, TimeEntry, ValidationTrail,
};
use crate::pools::{bucket_accounts, build_pools};
use crate::rates::resolve_rates;
use crate::validate::run_checks;

/// Run one month's analysis. The pipeline moves strictly forward:
/// aggregate → resolve rates → cost → classify → build pools → allocate →
/// margins → validate. Any fatal finding aborts the run with the full
/// fatal list; no partial output is ever produced.
pub fn run(config: &EngineConfig, input: &EngineInput) -> Result<RunResult, EngineError> {
    let mut trail = ValidationTrail::default();
    let mut fatals: Vec<Fatal> = Vec::new();

    // Aggregation and rate resolution are independent; collect fatals from
    // both before aborting so the operator sees everything at once.
    let records = match aggregate_revenue(&input.revenue, &config.categories, &mut trail) {
        Ok(records) => records,
        Err(found) => {
            fatals.extend(found);
            Vec::new()
        }
    };
    let expected_hours = config.numbers.expected_hours_per_month();
    let rates = match resolve_rates(&input.compensation, expected_hours, &mut trail) {
        Ok(rates) => rates,
        Err(found) => {
            fatals.extend(found);
            BTreeMap::new()
        }
    };
    if !fatals.is_empty() {
        return Err(EngineError::Aborted(fatals));
    }

    let costs = compute_direct_costs(&input.time, &input.expenses, &rates, input.month, &mut trail)
        .map_err(EngineError::Aborted)?;

    let classified = classify(&records, config, &costs.activity_codes, &mut trail)
        .map_err(EngineError::Aborted)?;
    trail.pass(
        "classification",
        format!(
            "{} revenue centers, {} cost centers, {} non-revenue clients",
            classified.revenue_centers.len(),
            classified.cost_centers.len(),
            classified.non_revenue.len(),
        ),
    );

    let accounts = bucket_accounts(&input.ledger, &config.account_rules, &mut trail)?;
    let totals = build_pools(&accounts, &classified, &costs, config, &mut trail);
    let allocations = allocate(&records, &classified.revenue_centers, totals);

    let revenue_centers =
        build_revenue_center_rows(&records, &classified.revenue_centers, &costs, &allocations);

    let cost_centers: Vec<CostCenterRow> = classified
        .cost_centers
        .iter()
        .map(|code| {
            let labor_cost = costs.labor_for(code);
            let expense_cost = costs.expense_for(code);
            CostCenterRow {
                contract_code: code.clone(),
                description: classified.cost_center_descriptions[code].clone(),
                pool: classified.cost_center_pools[code],
                hours: costs.hours_for(code),
                labor_cost,
                expense_cost,
                total_cost: labor_cost + expense_cost,
            }
        })
        .collect();

    let non_revenue_clients: Vec<NonRevenueRow> = classified
        .non_revenue
        .iter()
        .map(|code| {
            let labor_cost = costs.labor_for(code);
            let expense_cost = costs.expense_for(code);
            // A zero-revenue record still carries the project name.
            let project_name = records
                .iter()
                .find(|r| &r.contract_code == code)
                .map(|r| r.project_name.clone())
                .unwrap_or_default();
            NonRevenueRow {
                contract_code: code.clone(),
                project_name,
                hours: costs.hours_for(code),
                labor_cost,
                expense_cost,
                total_cost: labor_cost + expense_cost,
            }
        })
        .collect();

    let fatals = run_checks(
        &records,
        &classified.revenue_centers,
        input.expected_revenue,
        &allocations,
        &costs,
        config.numbers.tolerance,
        &mut trail,
    );
    if !fatals.is_empty() {
        return Err(EngineError::Aborted(fatals));
    }

    Ok(RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            month: input.month.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        revenue_centers,
        cost_centers,
        non_revenue_clients,
        allocations: allocations.rows,
        pools: allocations.pools,
        accounts,
        trail,
    })
}

// ---------------------------------------------------------------------------
// CSV loaders for the five normalized tables
// ---------------------------------------------------------------------------

struct Table<'a> {
    name: &'a str,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl<'a> Table<'a> {
    fn parse(name: &'a str, data: &str) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| EngineError::Io(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(Self { name, headers, records })
    }

    fn column(&self, name: &str) -> Result<usize, EngineError> {
        self.try_column(name).ok_or_else(|| EngineError::MissingColumn {
            table: self.name.into(),
            column: name.into(),
        })
    }

    fn try_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn field(&self, record: &csv::StringRecord, idx: usize) -> String {
        record.get(idx).unwrap_or("").trim().to_string()
    }

    fn number(&self, record: &csv::StringRecord, row: usize, idx: usize) -> Result<f64, EngineError> {
        let raw = self.field(record, idx);
        if raw.is_empty() {
            return Ok(0.0);
        }
        raw.replace(',', "").parse().map_err(|_| EngineError::NumberParse {
            table: self.name.into(),
            row,
            value: raw,
        })
    }

    fn date(
        &self,
        record: &csv::StringRecord,
        row: usize,
        idx: usize,
    ) -> Result<chrono::NaiveDate, EngineError> {
        let raw = self.field(record, idx);
        chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| EngineError::DateParse {
            table: self.name.into(),
            row,
            value: raw,
        })
    }
}

/// Columns: contract_code, project_name, section, allocation_tag, revenue.
pub fn load_revenue_csv(data: &str) -> Result<Vec<RevenueRow>, EngineError> {
    let table = Table::parse("revenue", data)?;
    let code_idx = table.column("contract_code")?;
    let name_idx = table.column("project_name")?;
    let section_idx = table.try_column("section");
    let tag_idx = table.column("allocation_tag")?;
    let revenue_idx = table.column("revenue")?;

    let mut rows = Vec::new();
    for (i, record) in table.records.iter().enumerate() {
        let tag = match table.field(record, tag_idx).to_lowercase().as_str() {
            "data" => AllocationTag::Data,
            "wellness" => AllocationTag::Wellness,
            _ => AllocationTag::None,
        };
        rows.push(RevenueRow {
            contract_code: table.field(record, code_idx),
            project_name: table.field(record, name_idx),
            section: section_idx.map(|idx| table.field(record, idx)).unwrap_or_default(),
            allocation_tag: tag,
            revenue: table.number(record, i + 1, revenue_idx)?,
        });
    }
    Ok(rows)
}

const COMPONENT_COLUMNS: [&str; 7] = [
    "base", "taxes", "benefits", "retirement", "assistant", "wellbeing", "travel",
];

/// Columns: staff_key, then either hourly_rate, a pre-summed monthly_cost,
/// or individual monthly component columns. Strategy A (direct rate) wins
/// per row whenever the field is non-empty.
pub fn load_compensation_csv(data: &str) -> Result<Vec<CompensationRow>, EngineError> {
    let table = Table::parse("compensation", data)?;
    let key_idx = table.column("staff_key")?;
    let hourly_idx = table.try_column("hourly_rate");
    let monthly_idx = table.try_column("monthly_cost");
    let component_idxs: Vec<usize> = COMPONENT_COLUMNS
        .iter()
        .filter_map(|c| table.try_column(c))
        .collect();

    if hourly_idx.is_none() && monthly_idx.is_none() && component_idxs.is_empty() {
        return Err(EngineError::MissingColumn {
            table: "compensation".into(),
            column: "hourly_rate or monthly_cost".into(),
        });
    }

    let mut rows = Vec::new();
    for (i, record) in table.records.iter().enumerate() {
        let row = i + 1;
        let direct = match hourly_idx {
            Some(idx) if !table.field(record, idx).is_empty() => {
                Some(table.number(record, row, idx)?)
            }
            _ => None,
        };

        let source = if let Some(rate) = direct {
            RateSource::Direct(rate)
        } else if let Some(idx) = monthly_idx.filter(|&idx| !table.field(record, idx).is_empty()) {
            RateSource::Monthly(table.number(record, row, idx)?)
        } else {
            let mut total = 0.0;
            for &idx in &component_idxs {
                total += table.number(record, row, idx)?;
            }
            RateSource::Monthly(total)
        };

        rows.push(CompensationRow {
            staff_key: table.field(record, key_idx),
            source,
        });
    }
    Ok(rows)
}

/// Columns: date, contract_code, staff_key, hours.
pub fn load_hours_csv(data: &str) -> Result<Vec<TimeEntry>, EngineError> {
    let table = Table::parse("hours", data)?;
    let date_idx = table.column("date")?;
    let code_idx = table.column("contract_code")?;
    let key_idx = table.column("staff_key")?;
    let hours_idx = table.column("hours")?;

    let mut rows = Vec::new();
    for (i, record) in table.records.iter().enumerate() {
        rows.push(TimeEntry {
            date: table.date(record, i + 1, date_idx)?,
            contract_code: table.field(record, code_idx),
            staff_key: table.field(record, key_idx),
            hours: table.number(record, i + 1, hours_idx)?,
        });
    }
    Ok(rows)
}

/// Columns: date, contract_code, amount, billable.
pub fn load_expenses_csv(data: &str) -> Result<Vec<ExpenseEntry>, EngineError> {
    let table = Table::parse("expenses", data)?;
    let date_idx = table.column("date")?;
    let code_idx = table.column("contract_code")?;
    let amount_idx = table.column("amount")?;
    let billable_idx = table.column("billable")?;

    let mut rows = Vec::new();
    for (i, record) in table.records.iter().enumerate() {
        let billable = match table.field(record, billable_idx).to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Billable::Yes,
            "no" | "n" | "false" | "0" => Billable::No,
            _ => Billable::Unknown,
        };
        rows.push(ExpenseEntry {
            date: table.date(record, i + 1, date_idx)?,
            contract_code: table.field(record, code_idx),
            amount: table.number(record, i + 1, amount_idx)?,
            billable,
        });
    }
    Ok(rows)
}

/// Columns: account, amount.
pub fn load_ledger_csv(data: &str) -> Result<Vec<LedgerRow>, EngineError> {
    let table = Table::parse("ledger", data)?;
    let account_idx = table.column("account")?;
    let amount_idx = table.column("amount")?;

    let mut rows = Vec::new();
    for (i, record) in table.records.iter().enumerate() {
        rows.push(LedgerRow {
            account: table.field(record, account_idx),
            amount: table.number(record, i + 1, amount_idx)?,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_revenue_basic() {
        let csv = "\
contract_code,project_name,section,allocation_tag,revenue
X-01,Alpha,BEH,Data,50000
X-01,Alpha,BEH,Data,43809
Y-02,Beta,WWB,Wellness,12000
Z-03,Gamma,BEH,,
";
        let rows = load_revenue_csv(csv).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].allocation_tag, AllocationTag::Data);
        assert_eq!(rows[2].allocation_tag, AllocationTag::Wellness);
        assert_eq!(rows[3].allocation_tag, AllocationTag::None);
        assert_eq!(rows[3].revenue, 0.0);
    }

    #[test]
    fn load_revenue_missing_column() {
        let err = load_revenue_csv("contract_code,revenue\nX,1\n").unwrap_err();
        assert!(err.to_string().contains("project_name"));
    }

    #[test]
    fn load_revenue_bad_number() {
        let csv = "contract_code,project_name,allocation_tag,revenue\nX,Alpha,,abc\n";
        let err = load_revenue_csv(csv).unwrap_err();
        assert!(err.to_string().contains("'abc'"));
    }

    #[test]
    fn load_compensation_direct_rate_wins() {
        let csv = "\
staff_key,hourly_rate,monthly_cost
Ngata,85.50,
Okafor,,21666.67
";
        let rows = load_compensation_csv(csv).unwrap();
        assert_eq!(rows[0].source, RateSource::Direct(85.5));
        assert_eq!(rows[1].source, RateSource::Monthly(21666.67));
    }

    #[test]
    fn load_compensation_components_summed() {
        let csv = "\
staff_key,base,taxes,benefits
Ngata,15000,1500,500
";
        let rows = load_compensation_csv(csv).unwrap();
        assert_eq!(rows[0].source, RateSource::Monthly(17000.0));
    }

    #[test]
    fn load_compensation_requires_a_rate_column() {
        let err = load_compensation_csv("staff_key\nNgata\n").unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn { .. }));
    }

    #[test]
    fn load_hours_basic() {
        let csv = "\
date,contract_code,staff_key,hours
2025-11-03,X-01,Ngata,7.5
2025-11-04,Y-02,Okafor,4
";
        let rows = load_hours_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hours, 7.5);
    }

    #[test]
    fn load_hours_bad_date() {
        let csv = "date,contract_code,staff_key,hours\n11/03/2025,X,N,1\n";
        let err = load_hours_csv(csv).unwrap_err();
        assert!(matches!(err, EngineError::DateParse { row: 1, .. }));
    }

    #[test]
    fn load_expenses_billable_parsing() {
        let csv = "\
date,contract_code,amount,billable
2025-11-03,X-01,100,Yes
2025-11-03,X-01,200,no
2025-11-03,X-01,300,Maybe
2025-11-03,X-01,400,
";
        let rows = load_expenses_csv(csv).unwrap();
        assert_eq!(rows[0].billable, Billable::Yes);
        assert_eq!(rows[1].billable, Billable::No);
        assert_eq!(rows[2].billable, Billable::Unknown);
        assert_eq!(rows[3].billable, Billable::Unknown);
    }

    #[test]
    fn load_ledger_strips_thousands_separators() {
        let csv = "account,amount\nOffice Rent,\"12,500.00\"\n";
        let rows = load_ledger_csv(csv).unwrap();
        assert_eq!(rows[0].amount, 12_500.0);
    }

    #[test]
    fn headers_matched_case_insensitively() {
        let csv = "Account,Amount\nRent,100\n";
        assert!(load_ledger_csv(csv).is_ok());
    }
}
