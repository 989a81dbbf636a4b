use std::collections::BTreeMap;

use crate::error::Fatal;
use crate::model::{CompensationRow, RateSource, RateStrategy, StaffRate, ValidationTrail};
use crate::normalize::normalize_code;

/// Resolve a fully-loaded hourly cost per staff key.
///
/// Strategy is selected per row: a direct hourly rate is used verbatim
/// (Strategy A); otherwise the monthly fully-loaded cost is divided by
/// `expected_hours` (Strategy B). Duplicate staff keys make the rate
/// ambiguous and are fatal; every duplicate is collected before failing.
pub fn resolve_rates(
    rows: &[CompensationRow],
    expected_hours: f64,
    trail: &mut ValidationTrail,
) -> Result<BTreeMap<String, StaffRate>, Vec<Fatal>> {
    let mut rates: BTreeMap<String, StaffRate> = BTreeMap::new();
    let mut duplicates: Vec<Fatal> = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(key) = normalize_code(&row.staff_key) else {
            dropped += 1;
            continue;
        };

        if rates.contains_key(&key) {
            if !duplicates.iter().any(|d| matches!(d, Fatal::DuplicateStaffKey { key: k } if *k == key)) {
                duplicates.push(Fatal::DuplicateStaffKey { key: key.clone() });
            }
            continue;
        }

        let rate = match row.source {
            RateSource::Direct(hourly) => StaffRate {
                hourly_cost: hourly,
                strategy: RateStrategy::Direct,
            },
            RateSource::Monthly(monthly) => StaffRate {
                hourly_cost: monthly / expected_hours,
                strategy: RateStrategy::Computed,
            },
        };
        rates.insert(key, rate);
    }

    if !duplicates.is_empty() {
        return Err(duplicates);
    }

    if dropped > 0 {
        trail.warn(
            "compensation_keys",
            format!("{dropped} compensation row(s) with blank staff key dropped"),
        );
    }

    Ok(rates)
}
