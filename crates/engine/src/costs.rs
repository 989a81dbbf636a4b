use std::collections::{BTreeMap, BTreeSet};

use crate::error::Fatal;
use crate::model::{Billable, ExpenseEntry, ReportingMonth, StaffRate, TimeEntry, ValidationTrail};
use crate::normalize::normalize_code;

/// Direct labor and expense totals per contract code, plus the set of codes
/// with any in-month activity (input to the classifier).
#[derive(Debug, Default)]
pub struct DirectCosts {
    pub hours: BTreeMap<String, f64>,
    pub labor: BTreeMap<String, f64>,
    pub expense: BTreeMap<String, f64>,
    pub activity_codes: BTreeSet<String>,
}

impl DirectCosts {
    pub fn hours_for(&self, code: &str) -> f64 {
        self.hours.get(code).copied().unwrap_or(0.0)
    }

    pub fn labor_for(&self, code: &str) -> f64 {
        self.labor.get(code).copied().unwrap_or(0.0)
    }

    pub fn expense_for(&self, code: &str) -> f64 {
        self.expense.get(code).copied().unwrap_or(0.0)
    }
}

/// Compute direct costs for the reporting month.
///
/// Labor: hours × resolved hourly rate per staff key. Staff keys with hours
/// but no rate are fatal, collected into a single finding so the operator
/// fixes the whole compensation file in one pass.
///
/// Expense: billable=No is included, billable=Yes excluded, Unknown included
/// conservatively with one aggregated warning naming the codes and amounts.
///
/// Rows outside the reporting month are excluded with an advisory. A code
/// missing from either map simply has zero cost.
pub fn compute_direct_costs(
    time: &[TimeEntry],
    expenses: &[ExpenseEntry],
    rates: &BTreeMap<String, StaffRate>,
    month: ReportingMonth,
    trail: &mut ValidationTrail,
) -> Result<DirectCosts, Vec<Fatal>> {
    let mut costs = DirectCosts::default();
    let mut missing_rates: BTreeSet<String> = BTreeSet::new();
    let mut time_outside = 0usize;
    let mut expense_outside = 0usize;
    let mut dropped = 0usize;

    for entry in time {
        if !month.contains(entry.date) {
            time_outside += 1;
            continue;
        }
        let Some(code) = normalize_code(&entry.contract_code) else {
            dropped += 1;
            continue;
        };
        let Some(key) = normalize_code(&entry.staff_key) else {
            dropped += 1;
            continue;
        };

        costs.activity_codes.insert(code.clone());
        match rates.get(&key) {
            Some(rate) => {
                *costs.hours.entry(code.clone()).or_insert(0.0) += entry.hours;
                *costs.labor.entry(code).or_insert(0.0) += entry.hours * rate.hourly_cost;
            }
            None => {
                missing_rates.insert(key);
            }
        }
    }

    if !missing_rates.is_empty() {
        return Err(vec![Fatal::MissingStaffRates {
            keys: missing_rates.into_iter().collect(),
        }]);
    }

    let mut unknown_billable: Vec<(String, f64)> = Vec::new();
    let mut excluded_reimbursable = 0usize;

    for entry in expenses {
        if !month.contains(entry.date) {
            expense_outside += 1;
            continue;
        }
        let Some(code) = normalize_code(&entry.contract_code) else {
            dropped += 1;
            continue;
        };

        match entry.billable {
            Billable::Yes => {
                excluded_reimbursable += 1;
                continue;
            }
            Billable::Unknown => unknown_billable.push((code.clone(), entry.amount)),
            Billable::No => {}
        }

        costs.activity_codes.insert(code.clone());
        *costs.expense.entry(code).or_insert(0.0) += entry.amount;
    }

    if time_outside > 0 {
        trail.warn(
            "month_filter_hours",
            format!("{time_outside} time entr(ies) outside {month} excluded"),
        );
    }
    if expense_outside > 0 {
        trail.warn(
            "month_filter_expenses",
            format!("{expense_outside} expense entr(ies) outside {month} excluded"),
        );
    }
    if dropped > 0 {
        trail.warn(
            "activity_codes",
            format!("{dropped} activity row(s) with blank key dropped"),
        );
    }
    if !unknown_billable.is_empty() {
        let detail: Vec<String> = unknown_billable
            .iter()
            .map(|(code, amount)| format!("{code} ${amount:.2}"))
            .collect();
        trail.warn(
            "unknown_billable",
            format!(
                "{} expense row(s) with unknown billable value included: {}",
                unknown_billable.len(),
                detail.join(", ")
            ),
        );
    }
    if excluded_reimbursable > 0 {
        trail.pass(
            "reimbursable_filter",
            format!("{excluded_reimbursable} reimbursable expense row(s) excluded"),
        );
    }

    Ok(costs)
}
