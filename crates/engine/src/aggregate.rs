use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::error::Fatal;
use crate::model::{AllocationTag, RevenueRecord, RevenueRow, ValidationTrail};
use crate::normalize::normalize_code;

struct Group {
    project_name: String,
    section: String,
    revenue: f64,
    saw_data: bool,
    saw_wellness: bool,
    rows: usize,
}

/// Collapse revenue rows into one record per normalized contract code,
/// preserving first-seen order. Revenue is summed; the allocation tag is
/// resolved by priority (Data over Wellness over blank); project name and
/// section take the first non-empty value.
///
/// A code carrying both Data and Wellness tags is a fatal conflict — it
/// would silently misallocate overhead. All conflicting codes are
/// collected before failing.
pub fn aggregate_revenue(
    rows: &[RevenueRow],
    categories: &BTreeMap<String, String>,
    trail: &mut ValidationTrail,
) -> Result<Vec<RevenueRecord>, Vec<Fatal>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(code) = normalize_code(&row.contract_code) else {
            dropped += 1;
            continue;
        };

        let group = groups.entry(code.clone()).or_insert_with(|| {
            order.push(code.clone());
            Group {
                project_name: String::new(),
                section: String::new(),
                revenue: 0.0,
                saw_data: false,
                saw_wellness: false,
                rows: 0,
            }
        });

        group.revenue += row.revenue;
        group.rows += 1;
        match row.allocation_tag {
            AllocationTag::Data => group.saw_data = true,
            AllocationTag::Wellness => group.saw_wellness = true,
            AllocationTag::None => {}
        }
        if group.project_name.is_empty() && !row.project_name.trim().is_empty() {
            group.project_name = row.project_name.trim().to_string();
        }
        if group.section.is_empty() && !row.section.trim().is_empty() {
            group.section = row.section.trim().to_string();
        }
    }

    if dropped > 0 {
        trail.warn(
            "revenue_codes",
            format!("{dropped} revenue row(s) with blank contract code dropped"),
        );
    }

    let conflicts: Vec<Fatal> = order
        .iter()
        .filter(|code| {
            let g = &groups[*code];
            g.saw_data && g.saw_wellness
        })
        .map(|code| Fatal::TagConflict { code: code.clone() })
        .collect();
    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    let merged = rows.len() - dropped - order.len();
    if merged > 0 {
        trail.warn(
            "revenue_duplicates",
            format!("{merged} duplicate revenue row(s) aggregated"),
        );
    }

    Ok(order
        .into_iter()
        .map(|code| {
            let g = groups.remove(&code).unwrap();
            let tag = if g.saw_data {
                AllocationTag::Data
            } else if g.saw_wellness {
                AllocationTag::Wellness
            } else {
                AllocationTag::None
            };
            let category = categories
                .get(&g.section)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            RevenueRecord {
                contract_code: code,
                project_name: g.project_name,
                section: g.section,
                category,
                allocation_tag: tag,
                revenue: g.revenue,
            }
        })
        .collect())
}
