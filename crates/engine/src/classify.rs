use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::error::Fatal;
use crate::model::{Classification, PoolName, RevenueRecord, ValidationTrail};

/// Total classification over every code with revenue, cost-center status,
/// or activity. Codes with none of the three never appear.
#[derive(Debug, Default)]
pub struct Classified {
    pub by_code: BTreeMap<String, Classification>,
    /// Revenue centers in first-seen revenue order.
    pub revenue_centers: Vec<String>,
    /// Cost centers in code order.
    pub cost_centers: Vec<String>,
    /// Non-revenue clients in code order.
    pub non_revenue: Vec<String>,
    /// Pool each cost center's overhead contributes to.
    pub cost_center_pools: BTreeMap<String, PoolName>,
    pub cost_center_descriptions: BTreeMap<String, String>,
}

/// Assign every observed contract code to exactly one class.
///
/// Decision order per code, first match wins:
/// 1. revenue > 0 → RevenueCenter
/// 2. matches the cost-center prefix → CostCenter (auto, SGA pool unless
///    explicitly configured otherwise)
/// 3. explicitly configured → CostCenter (manual)
/// 4. any recorded activity → NonRevenueClient
///
/// Revenue silently overrides the prefix heuristic but never overrides
/// explicit configuration: a code that is both a revenue center and a
/// manually configured cost center is fatal. All such codes are collected.
pub fn classify(
    records: &[RevenueRecord],
    config: &EngineConfig,
    activity_codes: &BTreeSet<String>,
    trail: &mut ValidationTrail,
) -> Result<Classified, Vec<Fatal>> {
    let revenue_by_code: BTreeMap<&str, f64> = records
        .iter()
        .map(|r| (r.contract_code.as_str(), r.revenue))
        .collect();

    let mut conflicts: Vec<Fatal> = Vec::new();
    for record in records {
        if record.revenue > 0.0 && config.cost_centers.contains_key(&record.contract_code) {
            conflicts.push(Fatal::CenterConflict {
                code: record.contract_code.clone(),
            });
        }
    }
    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    let negative: Vec<&str> = records
        .iter()
        .filter(|r| r.revenue < 0.0)
        .map(|r| r.contract_code.as_str())
        .collect();
    if !negative.is_empty() {
        trail.warn(
            "negative_revenue",
            format!("negative aggregated revenue for: {}", negative.join(", ")),
        );
    }

    // Domain: revenue-bearing codes, configured cost centers, active codes.
    let mut domain: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for record in records {
        if record.revenue > 0.0 && seen.insert(record.contract_code.clone()) {
            domain.push(record.contract_code.clone());
        }
    }
    for code in config.cost_centers.keys() {
        if seen.insert(code.clone()) {
            domain.push(code.clone());
        }
    }
    for code in activity_codes {
        if seen.insert(code.clone()) {
            domain.push(code.clone());
        }
    }

    let matches_prefix = |code: &str| {
        config
            .cost_center_prefix
            .as_deref()
            .is_some_and(|p| code.starts_with(p))
    };

    let mut classified = Classified::default();

    for code in domain {
        let has_revenue = revenue_by_code.get(code.as_str()).copied().unwrap_or(0.0) > 0.0;
        let manual = config.cost_centers.get(&code);

        let class = if has_revenue {
            Classification::RevenueCenter
        } else if matches_prefix(&code) || manual.is_some() {
            Classification::CostCenter
        } else {
            // The domain is the union of revenue-bearing, configured, and
            // active codes; only activity-bearing codes remain here.
            Classification::NonRevenueClient
        };

        match class {
            Classification::RevenueCenter => classified.revenue_centers.push(code.clone()),
            Classification::CostCenter => {
                let pool = manual.map(|m| m.pool).unwrap_or(PoolName::Sga);
                let description = manual
                    .map(|m| m.description.clone())
                    .unwrap_or_else(|| "Auto-detected cost center".to_string());
                classified.cost_center_pools.insert(code.clone(), pool);
                classified.cost_center_descriptions.insert(code.clone(), description);
                classified.cost_centers.push(code.clone());
            }
            Classification::NonRevenueClient => classified.non_revenue.push(code.clone()),
        }
        classified.by_code.insert(code, class);
    }

    classified.cost_centers.sort();
    classified.non_revenue.sort();

    if !classified.non_revenue.is_empty() {
        trail.warn(
            "non_revenue_clients",
            format!(
                "{} code(s) with activity but no revenue or cost-center status: {}",
                classified.non_revenue.len(),
                classified.non_revenue.join(", ")
            ),
        );
    }

    Ok(classified)
}
