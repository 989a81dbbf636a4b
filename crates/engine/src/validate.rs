use crate::allocate::AllocationSet;
use crate::costs::DirectCosts;
use crate::error::Fatal;
use crate::model::{RevenueRecord, ValidationTrail};

/// Final reconciliation pass. Every check lands in the trail as PASS, WARN,
/// or FAIL; FAIL findings are returned so the run can abort with the full
/// list and no partial output.
pub fn run_checks(
    records: &[RevenueRecord],
    revenue_centers: &[String],
    expected_revenue: Option<f64>,
    allocations: &AllocationSet,
    costs: &DirectCosts,
    tolerance: f64,
    trail: &mut ValidationTrail,
) -> Vec<Fatal> {
    let mut fatals = Vec::new();

    // Externally supplied month total.
    let calculated: f64 = records.iter().map(|r| r.revenue).sum();
    match expected_revenue {
        Some(expected) => {
            let diff = (calculated - expected).abs();
            if diff <= tolerance {
                trail.pass(
                    "revenue_total",
                    format!("aggregated revenue {calculated:.2} matches supplied total (±{tolerance})"),
                );
            } else {
                trail.fail(
                    "revenue_total",
                    format!("aggregated revenue {calculated:.2} vs supplied total {expected:.2} (diff {diff:.2})"),
                );
                fatals.push(Fatal::RevenueTotalMismatch { calculated, expected });
            }
        }
        None => {
            trail.warn("revenue_total", "no external month total supplied; check skipped");
        }
    }

    // Each pool's allocations must sum back to its total.
    for detail in &allocations.pools {
        let check = format!("{}_reconciliation", detail.name.to_string().to_lowercase());
        let allocated: f64 = allocations
            .rows
            .iter()
            .filter(|a| a.pool == detail.name)
            .map(|a| a.amount)
            .sum();

        if detail.revenue_base <= 0.0 {
            if detail.total != 0.0 {
                trail.warn(
                    &check,
                    format!("${:.2} unallocated (no eligible revenue base)", detail.total),
                );
            } else {
                trail.pass(&check, "empty pool, nothing to allocate");
            }
            continue;
        }

        let diff = (allocated - detail.total).abs();
        if diff <= tolerance {
            trail.pass(
                &check,
                format!("{:.2} allocated against pool {:.2} (±{tolerance})", allocated, detail.total),
            );
        } else {
            trail.fail(
                &check,
                format!("allocations {allocated:.2} vs pool {:.2} (diff {diff:.2})", detail.total),
            );
            fatals.push(Fatal::PoolMismatch {
                pool: detail.name,
                allocated,
                total: detail.total,
            });
        }
    }

    // Reasonableness: revenue with no logged hours is legal but notable.
    let no_hours: Vec<&str> = revenue_centers
        .iter()
        .filter(|code| costs.hours_for(code) == 0.0)
        .map(|code| code.as_str())
        .collect();
    if !no_hours.is_empty() {
        trail.warn(
            "revenue_without_hours",
            format!("{} revenue center(s) with no logged hours: {}", no_hours.len(), no_hours.join(", ")),
        );
    }

    fatals
}
