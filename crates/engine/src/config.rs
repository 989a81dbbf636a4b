use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::EngineError;
use crate::model::{Bucket, PoolName};
use crate::normalize::normalize_code;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    #[serde(default)]
    pub files: FileSet,
    #[serde(default)]
    pub numbers: NumericConfig,
    /// Explicitly configured cost centers, keyed by contract code.
    #[serde(default)]
    pub cost_centers: BTreeMap<String, CostCenterConfig>,
    /// Codes starting with this prefix are auto-detected cost centers.
    #[serde(default)]
    pub cost_center_prefix: Option<String>,
    /// Whether cost-center totals folded into the DATA pool are also
    /// removed from the SGA-side cost-center contribution.
    #[serde(default = "default_true")]
    pub deduct_folded_from_sga: bool,
    /// Whether cost-center overhead contributes to pools at all.
    #[serde(default = "default_true")]
    pub include_cost_centers_in_pools: bool,
    /// Section → analysis category. Reporting-only.
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    /// Ordered account-bucketing rules; first match wins.
    #[serde(default)]
    pub account_rules: Vec<AccountRule>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Input files
// ---------------------------------------------------------------------------

/// Paths to the five normalized tables, relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSet {
    #[serde(default = "FileSet::default_revenue")]
    pub revenue: String,
    #[serde(default = "FileSet::default_compensation")]
    pub compensation: String,
    #[serde(default = "FileSet::default_hours")]
    pub hours: String,
    #[serde(default = "FileSet::default_expenses")]
    pub expenses: String,
    #[serde(default = "FileSet::default_ledger")]
    pub ledger: String,
}

impl FileSet {
    fn default_revenue() -> String {
        "revenue.csv".into()
    }
    fn default_compensation() -> String {
        "compensation.csv".into()
    }
    fn default_hours() -> String {
        "hours.csv".into()
    }
    fn default_expenses() -> String {
        "expenses.csv".into()
    }
    fn default_ledger() -> String {
        "ledger.csv".into()
    }
}

impl Default for FileSet {
    fn default() -> Self {
        Self {
            revenue: Self::default_revenue(),
            compensation: Self::default_compensation(),
            hours: Self::default_hours(),
            expenses: Self::default_expenses(),
            ledger: Self::default_ledger(),
        }
    }
}

// ---------------------------------------------------------------------------
// Numeric settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NumericConfig {
    #[serde(default = "NumericConfig::default_hours_per_week")]
    pub hours_per_week: f64,
    #[serde(default = "NumericConfig::default_weeks_per_year")]
    pub weeks_per_year: f64,
    #[serde(default = "NumericConfig::default_months_per_year")]
    pub months_per_year: f64,
    /// Presentation rounding only; the engine never rounds internally.
    #[serde(default = "NumericConfig::default_round_digits")]
    pub round_digits: u32,
    #[serde(default = "NumericConfig::default_tolerance")]
    pub tolerance: f64,
}

impl NumericConfig {
    fn default_hours_per_week() -> f64 {
        50.0
    }
    fn default_weeks_per_year() -> f64 {
        52.0
    }
    fn default_months_per_year() -> f64 {
        12.0
    }
    fn default_round_digits() -> u32 {
        2
    }
    fn default_tolerance() -> f64 {
        0.01
    }

    /// Divisor for Strategy B rate computation. Defaults to 216.6667
    /// (50 h/week × 52 weeks / 12 months).
    pub fn expected_hours_per_month(&self) -> f64 {
        self.hours_per_week * self.weeks_per_year / self.months_per_year
    }
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            hours_per_week: Self::default_hours_per_week(),
            weeks_per_year: Self::default_weeks_per_year(),
            months_per_year: Self::default_months_per_year(),
            round_digits: Self::default_round_digits(),
            tolerance: Self::default_tolerance(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cost centers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CostCenterConfig {
    #[serde(default)]
    pub description: String,
    /// Pool this center's overhead contributes to.
    #[serde(default = "default_cc_pool")]
    pub pool: PoolName,
}

fn default_cc_pool() -> PoolName {
    PoolName::Sga
}

// ---------------------------------------------------------------------------
// Account-bucketing rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRule {
    pub match_type: MatchType,
    pub pattern: String,
    pub bucket: Bucket,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let mut config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Canonicalize config-side contract codes so they compare equal to
    /// normalized input codes. Blank keys are kept as-is for `validate`
    /// to reject.
    fn normalize(&mut self) {
        let centers = std::mem::take(&mut self.cost_centers);
        for (code, cc) in centers {
            match normalize_code(&code) {
                Some(normalized) => self.cost_centers.insert(normalized, cc),
                None => self.cost_centers.insert(code, cc),
            };
        }
        if let Some(prefix) = self.cost_center_prefix.take() {
            self.cost_center_prefix = Some(prefix.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let n = &self.numbers;
        if n.hours_per_week <= 0.0 || n.weeks_per_year <= 0.0 || n.months_per_year <= 0.0 {
            return Err(EngineError::ConfigValidation(
                "hours_per_week, weeks_per_year, and months_per_year must be positive".into(),
            ));
        }
        if n.tolerance <= 0.0 {
            return Err(EngineError::ConfigValidation(
                "tolerance must be positive".into(),
            ));
        }

        if let Some(ref prefix) = self.cost_center_prefix {
            if prefix.trim().is_empty() {
                return Err(EngineError::ConfigValidation(
                    "cost_center_prefix must not be blank".into(),
                ));
            }
        }

        for (code, cc) in &self.cost_centers {
            if code.trim().is_empty() {
                return Err(EngineError::ConfigValidation(
                    "cost center code must not be blank".into(),
                ));
            }
            // PoolName excludes NIL by construction; Workplace centers are
            // legal but unusual, so no further check here.
            let _ = cc;
        }

        for (i, rule) in self.account_rules.iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(EngineError::ConfigValidation(format!(
                    "account rule {i}: empty pattern"
                )));
            }
            if rule.match_type == MatchType::Regex {
                regex::RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        EngineError::ConfigValidation(format!(
                            "account rule {i}: invalid regex '{}': {e}",
                            rule.pattern
                        ))
                    })?;
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
