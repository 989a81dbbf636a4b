//! End-to-end runs against the public API: config from TOML, tables from
//! CSV, full pipeline through `run`.

use marginflow_engine::engine::{
    load_compensation_csv, load_expenses_csv, load_hours_csv, load_ledger_csv, load_revenue_csv,
};
use marginflow_engine::model::{CheckStatus, PoolName};
use marginflow_engine::{run, EngineConfig, EngineError, EngineInput, Fatal, ReportingMonth};

const CONFIG: &str = r#"
name = "November close"
cost_center_prefix = "INT-"

[cost_centers."INT-DEV"]
description = "Internal development"
pool = "DATA"

[categories]
"BEH" = "Advisory"
"WWB" = "Wellness"

[[account_rules]]
match_type = "exact"
pattern = "Data Warehouse Hosting"
bucket = "DATA"

[[account_rules]]
match_type = "contains"
pattern = "well-being coaches"
bucket = "WORKPLACE"

[[account_rules]]
match_type = "regex"
pattern = "^Depreciation"
bucket = "NIL"
"#;

const REVENUE: &str = "\
contract_code,project_name,section,allocation_tag,revenue
X-01,Alpha,BEH,Data,50000
X-01,Alpha,BEH,Data,25000
Y-02,Beta,WWB,Wellness,100000
Z-03,Gamma,BEH,,75000
";

const COMPENSATION: &str = "\
staff_key,hourly_rate,monthly_cost
Ngata,100,
Okafor,80,
";

const HOURS: &str = "\
date,contract_code,staff_key,hours
2025-11-03,X-01,Ngata,100
2025-11-04,Y-02,Okafor,125
2025-11-05,Z-03,Ngata,50
2025-11-06,INT-DEV,Okafor,75
";

const EXPENSES: &str = "\
date,contract_code,amount,billable
2025-11-10,X-01,1000,No
2025-11-11,Y-02,500,Yes
2025-11-12,INT-DEV,1000,No
";

const LEDGER: &str = "\
account,amount
Office Rent,30000
Data Warehouse Hosting,4000
Acme Well-Being Coaches,2000
Depreciation - Equipment,1000
";

fn input(revenue: &str, compensation: &str, expected: Option<f64>) -> EngineInput {
    EngineInput {
        revenue: load_revenue_csv(revenue).unwrap(),
        compensation: load_compensation_csv(compensation).unwrap(),
        time: load_hours_csv(HOURS).unwrap(),
        expenses: load_expenses_csv(EXPENSES).unwrap(),
        ledger: load_ledger_csv(LEDGER).unwrap(),
        month: ReportingMonth::parse("November2025").unwrap(),
        expected_revenue: expected,
    }
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn full_month_run() {
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let result = run(&config, &input(REVENUE, COMPENSATION, Some(250_000.0))).unwrap();

    // Revenue centers in first-seen order, duplicates collapsed.
    let codes: Vec<&str> = result
        .revenue_centers
        .iter()
        .map(|r| r.contract_code.as_str())
        .collect();
    assert_eq!(codes, vec!["X-01", "Y-02", "Z-03"]);

    let x = &result.revenue_centers[0];
    approx(x.revenue, 75_000.0);
    approx(x.labor_cost, 10_000.0);
    approx(x.expense_cost, 1_000.0);
    assert_eq!(x.category, "Advisory");

    // Pool totals: SGA = 30,000 rent − 7,000 cost-center fold = 23,000;
    // DATA = 4,000 warehouse + 7,000 INT-DEV; WORKPLACE = 2,000 coaches;
    // the 1,000 depreciation line lands in NIL and is never allocated.
    approx(x.sga_allocation, 75_000.0 / 250_000.0 * 23_000.0);
    approx(x.data_allocation, 11_000.0); // only Data-tagged center
    approx(x.workplace_allocation, 0.0);

    let y = &result.revenue_centers[1];
    approx(y.sga_allocation, 100_000.0 / 250_000.0 * 23_000.0);
    approx(y.data_allocation, 0.0);
    approx(y.workplace_allocation, 2_000.0); // only Wellness-tagged center

    let expected_margin = 75_000.0 - 10_000.0 - 1_000.0 - x.sga_allocation - 11_000.0;
    approx(x.margin, expected_margin);
    approx(x.margin_pct.unwrap(), expected_margin / 75_000.0);

    // INT-DEV classified by prefix + explicit config, folded into DATA.
    assert_eq!(result.cost_centers.len(), 1);
    let dev = &result.cost_centers[0];
    assert_eq!(dev.contract_code, "INT-DEV");
    assert_eq!(dev.pool, PoolName::Data);
    approx(dev.labor_cost, 6_000.0);
    approx(dev.expense_cost, 1_000.0);
    approx(dev.total_cost, 7_000.0);

    assert!(result.non_revenue_clients.is_empty());

    // Every pool reconciles; no failures anywhere in the trail.
    assert!(!result.trail.has_failures());
    assert!(result
        .trail
        .entries
        .iter()
        .any(|e| e.check == "revenue_total" && e.status == CheckStatus::Pass));
    assert!(result
        .trail
        .entries
        .iter()
        .any(|e| e.check == "unmatched_accounts" && e.detail.contains("Office Rent")));

    assert_eq!(result.meta.month, "2025-11");
    assert_eq!(result.meta.config_name, "November close");
}

#[test]
fn allocations_reconcile_to_pool_totals() {
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let result = run(&config, &input(REVENUE, COMPENSATION, None)).unwrap();

    for detail in &result.pools {
        let allocated: f64 = result
            .allocations
            .iter()
            .filter(|a| a.pool == detail.name)
            .map(|a| a.amount)
            .sum();
        if detail.revenue_base > 0.0 {
            assert!(
                (allocated - detail.total).abs() <= 0.01,
                "{} off by {}",
                detail.name,
                (allocated - detail.total).abs()
            );
        }
    }
}

#[test]
fn tag_conflict_aborts_the_run() {
    let revenue = "\
contract_code,project_name,section,allocation_tag,revenue
X-01,Alpha,BEH,Data,50000
X-01,Alpha,BEH,Wellness,25000
";
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let err = run(&config, &input(revenue, COMPENSATION, None)).unwrap_err();
    match err {
        EngineError::Aborted(fatals) => {
            assert_eq!(fatals, vec![Fatal::TagConflict { code: "X-01".into() }]);
        }
        other => panic!("expected abort, got {other}"),
    }
}

#[test]
fn missing_rate_aborts_with_all_keys() {
    let compensation = "staff_key,hourly_rate\nNgata,100\n";
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let err = run(&config, &input(REVENUE, compensation, None)).unwrap_err();
    match err {
        EngineError::Aborted(fatals) => {
            assert_eq!(
                fatals,
                vec![Fatal::MissingStaffRates { keys: vec!["Okafor".into()] }]
            );
        }
        other => panic!("expected abort, got {other}"),
    }
}

#[test]
fn revenue_bearing_manual_cost_center_aborts() {
    let config_toml = format!("{CONFIG}\n[cost_centers.\"X-01\"]\ndescription = \"Wrong\"\n");
    let config = EngineConfig::from_toml(&config_toml).unwrap();
    let err = run(&config, &input(REVENUE, COMPENSATION, None)).unwrap_err();
    match err {
        EngineError::Aborted(fatals) => {
            assert_eq!(fatals, vec![Fatal::CenterConflict { code: "X-01".into() }]);
        }
        other => panic!("expected abort, got {other}"),
    }
}

#[test]
fn revenue_total_mismatch_aborts_after_full_trail() {
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let err = run(&config, &input(REVENUE, COMPENSATION, Some(999_999.0))).unwrap_err();
    match err {
        EngineError::Aborted(fatals) => {
            assert!(matches!(fatals[0], Fatal::RevenueTotalMismatch { .. }));
        }
        other => panic!("expected abort, got {other}"),
    }
}

#[test]
fn duplicate_staff_key_and_tag_conflict_reported_together() {
    // Independent early-stage fatals surface in one abort.
    let revenue = "\
contract_code,project_name,section,allocation_tag,revenue
X-01,Alpha,BEH,Data,50000
X-01,Alpha,BEH,Wellness,25000
";
    let compensation = "\
staff_key,hourly_rate
Ngata,100
Ngata,120
Okafor,80
";
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let err = run(&config, &input(revenue, compensation, None)).unwrap_err();
    match err {
        EngineError::Aborted(fatals) => {
            assert!(fatals.contains(&Fatal::TagConflict { code: "X-01".into() }));
            assert!(fatals.contains(&Fatal::DuplicateStaffKey { key: "Ngata".into() }));
        }
        other => panic!("expected abort, got {other}"),
    }
}

#[test]
fn zero_base_pool_reports_one_warning() {
    // Workplace money with no Wellness-tagged revenue center: the money
    // stays unallocated and exactly one trail entry says so.
    let revenue = "\
contract_code,project_name,section,allocation_tag,revenue
X-01,Alpha,BEH,Data,75000
";
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let result = run(&config, &input(revenue, COMPENSATION, None)).unwrap();

    assert!(result
        .allocations
        .iter()
        .all(|a| a.pool != PoolName::Workplace));
    let warnings: Vec<_> = result
        .trail
        .entries
        .iter()
        .filter(|e| e.status == CheckStatus::Warn && e.detail.contains("unallocated"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].check, "workplace_reconciliation");
}

#[test]
fn out_of_month_rows_do_not_contribute() {
    let hours = "\
date,contract_code,staff_key,hours
2025-11-03,X-01,Ngata,100
2025-10-31,X-01,Ngata,500
2025-12-01,X-01,Ngata,500
";
    let config = EngineConfig::from_toml(CONFIG).unwrap();
    let mut inp = input(REVENUE, COMPENSATION, None);
    inp.time = load_hours_csv(hours).unwrap();
    let result = run(&config, &inp).unwrap();
    let x = result
        .revenue_centers
        .iter()
        .find(|r| r.contract_code == "X-01")
        .unwrap();
    approx(x.hours, 100.0);
    approx(x.labor_cost, 10_000.0);
    assert!(result
        .trail
        .entries
        .iter()
        .any(|e| e.check == "month_filter_hours"));
}
