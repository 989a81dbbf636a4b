use crate::model::{
    Allocation, AllocationTag, PoolDetail, PoolName, PoolTotals, RevenueRecord,
};

/// Allocations for all three pools plus per-pool detail.
#[derive(Debug, Default)]
pub struct AllocationSet {
    pub rows: Vec<Allocation>,
    pub pools: Vec<PoolDetail>,
}

impl AllocationSet {
    pub fn amount(&self, code: &str, pool: PoolName) -> f64 {
        self.rows
            .iter()
            .find(|a| a.pool == pool && a.contract_code == code)
            .map(|a| a.amount)
            .unwrap_or(0.0)
    }
}

/// Distribute each pool pro-rata by revenue across its eligible codes.
///
/// SGA is eligible to every revenue center and a row is recorded even when
/// the amount is zero. DATA and WORKPLACE rows are emitted only for codes
/// carrying the matching tag. Allocations are exact
/// `(revenue / base) * pool_total` with no intermediate rounding.
///
/// A pool whose eligible revenue base is zero allocates nothing: every
/// amount is exactly 0 and the validation pass reports the unallocated
/// total, never force-distributed elsewhere.
pub fn allocate(
    records: &[RevenueRecord],
    revenue_centers: &[String],
    totals: PoolTotals,
) -> AllocationSet {
    let eligible_all: Vec<&RevenueRecord> = revenue_centers
        .iter()
        .filter_map(|code| records.iter().find(|r| &r.contract_code == code))
        .collect();
    let eligible_data: Vec<&RevenueRecord> = eligible_all
        .iter()
        .copied()
        .filter(|r| r.allocation_tag == AllocationTag::Data)
        .collect();
    let eligible_wellness: Vec<&RevenueRecord> = eligible_all
        .iter()
        .copied()
        .filter(|r| r.allocation_tag == AllocationTag::Wellness)
        .collect();

    let mut set = AllocationSet::default();
    allocate_pool(PoolName::Sga, totals.sga, &eligible_all, &mut set);
    allocate_pool(PoolName::Data, totals.data, &eligible_data, &mut set);
    allocate_pool(PoolName::Workplace, totals.workplace, &eligible_wellness, &mut set);
    set
}

fn allocate_pool(pool: PoolName, total: f64, eligible: &[&RevenueRecord], set: &mut AllocationSet) {
    let base: f64 = eligible.iter().map(|r| r.revenue).sum();

    if base <= 0.0 {
        for record in eligible {
            set.rows.push(Allocation {
                contract_code: record.contract_code.clone(),
                pool,
                amount: 0.0,
            });
        }
    } else {
        for record in eligible {
            set.rows.push(Allocation {
                contract_code: record.contract_code.clone(),
                pool,
                amount: (record.revenue / base) * total,
            });
        }
    }

    set.pools.push(PoolDetail {
        name: pool,
        total,
        revenue_base: base,
        eligible_codes: eligible.len(),
    });
}
