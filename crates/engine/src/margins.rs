use crate::allocate::AllocationSet;
use crate::costs::DirectCosts;
use crate::model::{PoolName, RevenueCenterRow, RevenueRecord};

/// Margin dollars and, when revenue is positive, margin as a fraction of
/// revenue. Zero-revenue codes never divide; the percentage is omitted.
pub fn margin(revenue: f64, total_cost: f64) -> (f64, Option<f64>) {
    let margin = revenue - total_cost;
    let pct = if revenue > 0.0 { Some(margin / revenue) } else { None };
    (margin, pct)
}

/// Assemble the final revenue-center rows: revenue minus direct labor,
/// direct expense, and the three pool allocations.
pub fn build_revenue_center_rows(
    records: &[RevenueRecord],
    revenue_centers: &[String],
    costs: &DirectCosts,
    allocations: &AllocationSet,
) -> Vec<RevenueCenterRow> {
    revenue_centers
        .iter()
        .filter_map(|code| records.iter().find(|r| &r.contract_code == code))
        .map(|record| {
            let code = record.contract_code.as_str();
            let labor_cost = costs.labor_for(code);
            let expense_cost = costs.expense_for(code);
            let sga_allocation = allocations.amount(code, PoolName::Sga);
            let data_allocation = allocations.amount(code, PoolName::Data);
            let workplace_allocation = allocations.amount(code, PoolName::Workplace);
            let total_cost = labor_cost
                + expense_cost
                + sga_allocation
                + data_allocation
                + workplace_allocation;
            let (margin, margin_pct) = margin(record.revenue, total_cost);

            RevenueCenterRow {
                contract_code: record.contract_code.clone(),
                project_name: record.project_name.clone(),
                category: record.category.clone(),
                allocation_tag: record.allocation_tag,
                revenue: record.revenue,
                hours: costs.hours_for(code),
                labor_cost,
                expense_cost,
                sga_allocation,
                data_allocation,
                workplace_allocation,
                margin,
                margin_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Allocation, AllocationTag, PoolDetail};

    #[test]
    fn margin_math() {
        let (m, pct) = margin(100_000.0, 75_000.0);
        assert_eq!(m, 25_000.0);
        assert_eq!(pct, Some(0.25));
    }

    #[test]
    fn zero_revenue_omits_percentage() {
        let (m, pct) = margin(0.0, 500.0);
        assert_eq!(m, -500.0);
        assert_eq!(pct, None);
    }

    #[test]
    fn rows_carry_full_waterfall() {
        let records = vec![RevenueRecord {
            contract_code: "X-01".into(),
            project_name: "Alpha".into(),
            section: "BEH".into(),
            category: "Advisory".into(),
            allocation_tag: AllocationTag::Data,
            revenue: 100_000.0,
        }];
        let centers = vec!["X-01".to_string()];
        let mut costs = DirectCosts::default();
        costs.hours.insert("X-01".into(), 120.0);
        costs.labor.insert("X-01".into(), 30_000.0);
        costs.expense.insert("X-01".into(), 5_000.0);
        let allocations = AllocationSet {
            rows: vec![
                Allocation { contract_code: "X-01".into(), pool: PoolName::Sga, amount: 20_000.0 },
                Allocation { contract_code: "X-01".into(), pool: PoolName::Data, amount: 10_000.0 },
            ],
            pools: Vec::<PoolDetail>::new(),
        };

        let rows = build_revenue_center_rows(&records, &centers, &costs, &allocations);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.hours, 120.0);
        assert_eq!(row.workplace_allocation, 0.0);
        assert_eq!(row.margin, 100_000.0 - 30_000.0 - 5_000.0 - 20_000.0 - 10_000.0);
        assert_eq!(row.margin_pct, Some(row.margin / 100_000.0));
    }

    #[test]
    fn codes_without_activity_default_to_zero_cost() {
        let records = vec![RevenueRecord {
            contract_code: "X-01".into(),
            project_name: "Alpha".into(),
            section: String::new(),
            category: "Unknown".into(),
            allocation_tag: AllocationTag::None,
            revenue: 1_000.0,
        }];
        let rows = build_revenue_center_rows(
            &records,
            &["X-01".to_string()],
            &DirectCosts::default(),
            &AllocationSet::default(),
        );
        assert_eq!(rows[0].labor_cost, 0.0);
        assert_eq!(rows[0].margin, 1_000.0);
    }
}
