use crate::classify::Classified;
use crate::config::{AccountRule, EngineConfig, MatchType};
use crate::costs::DirectCosts;
use crate::error::EngineError;
use crate::model::{Bucket, BucketedAccount, LedgerRow, MatchedBy, PoolName, PoolTotals, ValidationTrail};

/// Bucket ledger accounts using the ordered rule list; first matching rule
/// wins. Exact and contains matches are case-insensitive; regex patterns
/// are compiled case-insensitive as the config layer validates them.
/// Unmatched accounts default to SGA with a warning naming them.
pub fn bucket_accounts(
    ledger: &[LedgerRow],
    rules: &[AccountRule],
    trail: &mut ValidationTrail,
) -> Result<Vec<BucketedAccount>, EngineError> {
    let compiled: Vec<Option<regex::Regex>> = rules
        .iter()
        .map(|rule| {
            if rule.match_type == MatchType::Regex {
                regex::RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(Some)
                    .map_err(|e| {
                        EngineError::ConfigValidation(format!(
                            "invalid regex '{}': {e}",
                            rule.pattern
                        ))
                    })
            } else {
                Ok(None)
            }
        })
        .collect::<Result<_, _>>()?;

    let mut accounts = Vec::new();
    let mut unmatched: Vec<String> = Vec::new();

    for row in ledger {
        let account = row.account.trim();
        if account.is_empty() || row.amount == 0.0 {
            continue;
        }

        let mut hit: Option<(Bucket, MatchedBy)> = None;
        for (rule, re) in rules.iter().zip(&compiled) {
            let matched = match rule.match_type {
                MatchType::Exact => account.eq_ignore_ascii_case(&rule.pattern),
                MatchType::Contains => account
                    .to_lowercase()
                    .contains(&rule.pattern.to_lowercase()),
                MatchType::Regex => re.as_ref().is_some_and(|re| re.is_match(account)),
            };
            if matched {
                let by = match rule.match_type {
                    MatchType::Exact => MatchedBy::Exact,
                    MatchType::Contains => MatchedBy::Contains,
                    MatchType::Regex => MatchedBy::Regex,
                };
                hit = Some((rule.bucket, by));
                break;
            }
        }

        let (bucket, matched_by) = hit.unwrap_or((Bucket::Sga, MatchedBy::Default));
        if matched_by == MatchedBy::Default {
            unmatched.push(account.to_string());
        }

        accounts.push(BucketedAccount {
            account: account.to_string(),
            amount: row.amount,
            bucket,
            matched_by,
        });
    }

    if !unmatched.is_empty() {
        trail.warn(
            "unmatched_accounts",
            format!(
                "{} ledger account(s) defaulted to SGA: {}",
                unmatched.len(),
                unmatched.join(", ")
            ),
        );
    }

    Ok(accounts)
}

/// Fix the three pool totals from bucketed accounts plus cost-center
/// contributions.
///
/// Each cost center's labor + expense total flows into its assigned pool.
/// When `deduct_folded_from_sga` is set, totals folded into the DATA or
/// WORKPLACE pools are also removed from the SGA ledger-side total — the
/// underlying payroll already sits in SGA-bucketed accounts, so leaving it
/// there would double count. When unset, that exclusion is assumed to be
/// reflected in account tagging.
pub fn build_pools(
    accounts: &[BucketedAccount],
    classified: &Classified,
    costs: &DirectCosts,
    config: &EngineConfig,
    trail: &mut ValidationTrail,
) -> PoolTotals {
    let mut totals = PoolTotals::default();

    for account in accounts {
        match account.bucket {
            Bucket::Sga => totals.sga += account.amount,
            Bucket::Data => totals.data += account.amount,
            Bucket::Workplace => totals.workplace += account.amount,
            Bucket::Nil => totals.nil += account.amount,
        }
    }

    if config.include_cost_centers_in_pools {
        let mut folded = 0.0;
        for code in &classified.cost_centers {
            let total_cost = costs.labor_for(code) + costs.expense_for(code);
            match classified.cost_center_pools[code] {
                PoolName::Sga => totals.sga += total_cost,
                PoolName::Data => {
                    totals.data += total_cost;
                    folded += total_cost;
                }
                PoolName::Workplace => {
                    totals.workplace += total_cost;
                    folded += total_cost;
                }
            }
        }
        if folded > 0.0 && config.deduct_folded_from_sga {
            totals.sga -= folded;
            trail.pass(
                "pool_folding",
                format!("${folded:.2} of cost-center overhead moved from SGA into assigned pools"),
            );
        }
    }

    if totals.nil != 0.0 {
        trail.pass(
            "nil_bucket",
            format!("${:.2} in NIL-tagged accounts excluded from all pools", totals.nil),
        );
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationTrail;
    use std::collections::BTreeMap;

    fn row(account: &str, amount: f64) -> LedgerRow {
        LedgerRow { account: account.into(), amount }
    }

    fn rule(match_type: MatchType, pattern: &str, bucket: Bucket) -> AccountRule {
        AccountRule { match_type, pattern: pattern.into(), bucket }
    }

    #[test]
    fn first_matching_rule_wins() {
        // A payroll "Wellbeing Benefit" line must not fall through to the
        // broader vendor pattern below it.
        let rules = vec![
            rule(MatchType::Exact, "Wellbeing Benefit", Bucket::Sga),
            rule(MatchType::Contains, "well-being coaches", Bucket::Workplace),
            rule(MatchType::Regex, "well.?being", Bucket::Workplace),
        ];
        let ledger = vec![
            row("Wellbeing Benefit", 500.0),
            row("Acme Well-Being Coaches LLC", 1200.0),
        ];
        let mut trail = ValidationTrail::default();
        let accounts = bucket_accounts(&ledger, &rules, &mut trail).unwrap();
        assert_eq!(accounts[0].bucket, Bucket::Sga);
        assert_eq!(accounts[0].matched_by, MatchedBy::Exact);
        assert_eq!(accounts[1].bucket, Bucket::Workplace);
        assert_eq!(accounts[1].matched_by, MatchedBy::Contains);
    }

    #[test]
    fn exact_and_contains_are_case_insensitive() {
        let rules = vec![
            rule(MatchType::Exact, "data warehouse hosting", Bucket::Data),
            rule(MatchType::Contains, "SNOWFLAKE", Bucket::Data),
        ];
        let ledger = vec![
            row("Data Warehouse Hosting", 100.0),
            row("snowflake compute", 200.0),
        ];
        let mut trail = ValidationTrail::default();
        let accounts = bucket_accounts(&ledger, &rules, &mut trail).unwrap();
        assert_eq!(accounts[0].bucket, Bucket::Data);
        assert_eq!(accounts[1].bucket, Bucket::Data);
    }

    #[test]
    fn regex_rule_matches() {
        let rules = vec![rule(MatchType::Regex, "^depreciation", Bucket::Nil)];
        let ledger = vec![row("Depreciation - Equipment", 900.0)];
        let mut trail = ValidationTrail::default();
        let accounts = bucket_accounts(&ledger, &rules, &mut trail).unwrap();
        assert_eq!(accounts[0].bucket, Bucket::Nil);
        assert_eq!(accounts[0].matched_by, MatchedBy::Regex);
    }

    #[test]
    fn unmatched_defaults_to_sga_with_warning() {
        let mut trail = ValidationTrail::default();
        let accounts = bucket_accounts(&[row("Office Rent", 3000.0)], &[], &mut trail).unwrap();
        assert_eq!(accounts[0].bucket, Bucket::Sga);
        assert_eq!(accounts[0].matched_by, MatchedBy::Default);
        assert!(trail.entries[0].detail.contains("Office Rent"));
    }

    #[test]
    fn zero_amount_rows_skipped() {
        let mut trail = ValidationTrail::default();
        let accounts = bucket_accounts(&[row("Empty", 0.0)], &[], &mut trail).unwrap();
        assert!(accounts.is_empty());
        assert!(trail.entries.is_empty());
    }

    fn classified_with(code: &str, pool: PoolName) -> Classified {
        let mut c = Classified::default();
        c.cost_centers.push(code.to_string());
        c.cost_center_pools.insert(code.to_string(), pool);
        c
    }

    fn costs_with(code: &str, labor: f64, expense: f64) -> DirectCosts {
        let mut costs = DirectCosts::default();
        costs.labor = BTreeMap::from([(code.to_string(), labor)]);
        costs.expense = BTreeMap::from([(code.to_string(), expense)]);
        costs
    }

    fn base_accounts() -> Vec<BucketedAccount> {
        vec![
            BucketedAccount { account: "Rent".into(), amount: 10_000.0, bucket: Bucket::Sga, matched_by: MatchedBy::Default },
            BucketedAccount { account: "Warehouse".into(), amount: 4_000.0, bucket: Bucket::Data, matched_by: MatchedBy::Exact },
            BucketedAccount { account: "Coaches".into(), amount: 2_000.0, bucket: Bucket::Workplace, matched_by: MatchedBy::Contains },
            BucketedAccount { account: "Depreciation".into(), amount: 1_000.0, bucket: Bucket::Nil, matched_by: MatchedBy::Regex },
        ]
    }

    #[test]
    fn nil_excluded_from_sga() {
        let config = EngineConfig::from_toml("name = \"t\"").unwrap();
        let mut trail = ValidationTrail::default();
        let totals = build_pools(
            &base_accounts(),
            &Classified::default(),
            &DirectCosts::default(),
            &config,
            &mut trail,
        );
        assert_eq!(totals.sga, 10_000.0);
        assert_eq!(totals.data, 4_000.0);
        assert_eq!(totals.workplace, 2_000.0);
        assert_eq!(totals.nil, 1_000.0);
    }

    #[test]
    fn data_cost_center_folds_into_data_and_out_of_sga() {
        let config = EngineConfig::from_toml("name = \"t\"").unwrap();
        let classified = classified_with("INT-DEV", PoolName::Data);
        let costs = costs_with("INT-DEV", 3_000.0, 500.0);
        let mut trail = ValidationTrail::default();
        let totals = build_pools(&base_accounts(), &classified, &costs, &config, &mut trail);
        assert_eq!(totals.data, 4_000.0 + 3_500.0);
        assert_eq!(totals.sga, 10_000.0 - 3_500.0);
    }

    #[test]
    fn fold_without_sga_deduction_when_flag_unset() {
        let config =
            EngineConfig::from_toml("name = \"t\"\ndeduct_folded_from_sga = false").unwrap();
        let classified = classified_with("INT-DEV", PoolName::Data);
        let costs = costs_with("INT-DEV", 3_000.0, 500.0);
        let mut trail = ValidationTrail::default();
        let totals = build_pools(&base_accounts(), &classified, &costs, &config, &mut trail);
        assert_eq!(totals.data, 7_500.0);
        assert_eq!(totals.sga, 10_000.0);
    }

    #[test]
    fn sga_cost_center_adds_to_sga() {
        let config = EngineConfig::from_toml("name = \"t\"").unwrap();
        let classified = classified_with("INT-OPS", PoolName::Sga);
        let costs = costs_with("INT-OPS", 1_000.0, 200.0);
        let mut trail = ValidationTrail::default();
        let totals = build_pools(&base_accounts(), &classified, &costs, &config, &mut trail);
        assert_eq!(totals.sga, 11_200.0);
    }

    #[test]
    fn cost_centers_ignored_when_contributions_disabled() {
        let config =
            EngineConfig::from_toml("name = \"t\"\ninclude_cost_centers_in_pools = false").unwrap();
        let classified = classified_with("INT-DEV", PoolName::Data);
        let costs = costs_with("INT-DEV", 3_000.0, 500.0);
        let mut trail = ValidationTrail::default();
        let totals = build_pools(&base_accounts(), &classified, &costs, &config, &mut trail);
        assert_eq!(totals.data, 4_000.0);
        assert_eq!(totals.sga, 10_000.0);
    }
}
