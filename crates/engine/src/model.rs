use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Reporting month
// ---------------------------------------------------------------------------

/// The month a run covers. Time and expense entries outside this range are
/// excluded with an advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingMonth {
    pub year: i32,
    pub month: u32,
}

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

impl ReportingMonth {
    /// Parse `"November2025"`, `"Nov2025"`, or `"2025-11"`.
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let trimmed = value.trim();

        if let Some((y, m)) = trimmed.split_once('-') {
            let year: i32 = y.parse().map_err(|_| EngineError::InvalidMonth(value.into()))?;
            let month: u32 = m.parse().map_err(|_| EngineError::InvalidMonth(value.into()))?;
            if !(1..=12).contains(&month) {
                return Err(EngineError::InvalidMonth(value.into()));
            }
            return Ok(Self { year, month });
        }

        let split = trimmed.find(|c: char| c.is_ascii_digit());
        let Some(split) = split else {
            return Err(EngineError::InvalidMonth(value.into()));
        };
        let (name, digits) = trimmed.split_at(split);
        let year: i32 = digits.parse().map_err(|_| EngineError::InvalidMonth(value.into()))?;
        let lower = name.to_lowercase();
        let month = MONTH_NAMES
            .iter()
            .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(&lower)))
            .ok_or_else(|| EngineError::InvalidMonth(value.into()))?;

        Ok(Self { year, month: month as u32 + 1 })
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 31).unwrap())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for ReportingMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// Eligibility marker for the two narrow overhead pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTag {
    Data,
    Wellness,
    None,
}

impl std::fmt::Display for AllocationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "Data"),
            Self::Wellness => write!(f, "Wellness"),
            Self::None => write!(f, ""),
        }
    }
}

/// A single pre-aggregation revenue row.
#[derive(Debug, Clone)]
pub struct RevenueRow {
    pub contract_code: String,
    pub project_name: String,
    pub section: String,
    pub allocation_tag: AllocationTag,
    pub revenue: f64,
}

/// Per-row rate strategy selection: a direct hourly rate wins whenever
/// present; otherwise the monthly fully-loaded cost (pre-summed by the
/// loading layer) is divided by expected hours per month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateSource {
    Direct(f64),
    Monthly(f64),
}

#[derive(Debug, Clone)]
pub struct CompensationRow {
    pub staff_key: String,
    pub source: RateSource,
}

#[derive(Debug, Clone)]
pub struct TimeEntry {
    pub date: NaiveDate,
    pub contract_code: String,
    pub staff_key: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Billable {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ExpenseEntry {
    pub date: NaiveDate,
    pub contract_code: String,
    pub amount: f64,
    pub billable: Billable,
}

#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub account: String,
    pub amount: f64,
}

/// Pre-loaded normalized tables for one month's run.
pub struct EngineInput {
    pub revenue: Vec<RevenueRow>,
    pub compensation: Vec<CompensationRow>,
    pub time: Vec<TimeEntry>,
    pub expenses: Vec<ExpenseEntry>,
    pub ledger: Vec<LedgerRow>,
    pub month: ReportingMonth,
    /// Externally supplied month revenue total; when absent the total check
    /// is skipped with a warning.
    pub expected_revenue: Option<f64>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One revenue record per distinct normalized contract code.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueRecord {
    pub contract_code: String,
    pub project_name: String,
    pub section: String,
    pub category: String,
    pub allocation_tag: AllocationTag,
    pub revenue: f64,
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateStrategy {
    /// Direct hourly rate read verbatim.
    Direct,
    /// Monthly fully-loaded cost / expected hours per month.
    Computed,
}

impl std::fmt::Display for RateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "A"),
            Self::Computed => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StaffRate {
    pub hourly_cost: f64,
    pub strategy: RateStrategy,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    RevenueCenter,
    CostCenter,
    NonRevenueClient,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RevenueCenter => write!(f, "revenue_center"),
            Self::CostCenter => write!(f, "cost_center"),
            Self::NonRevenueClient => write!(f, "non_revenue_client"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pools + allocations
// ---------------------------------------------------------------------------

/// The three allocated overhead pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolName {
    Sga,
    Data,
    Workplace,
}

impl std::fmt::Display for PoolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sga => write!(f, "SGA"),
            Self::Data => write!(f, "DATA"),
            Self::Workplace => write!(f, "WORKPLACE"),
        }
    }
}

/// Ledger-account bucket. NIL rows are tracked for reconciliation but never
/// pooled or allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    Data,
    Workplace,
    Nil,
    Sga,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "DATA"),
            Self::Workplace => write!(f, "WORKPLACE"),
            Self::Nil => write!(f, "NIL"),
            Self::Sga => write!(f, "SGA"),
        }
    }
}

/// Which rule kind matched a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Exact,
    Contains,
    Regex,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketedAccount {
    pub account: String,
    pub amount: f64,
    pub bucket: Bucket,
    pub matched_by: MatchedBy,
}

/// Final pool totals after ledger bucketing and cost-center folding.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PoolTotals {
    pub sga: f64,
    pub data: f64,
    pub workplace: f64,
    /// Reconciliation-only; never allocated.
    pub nil: f64,
}

impl PoolTotals {
    pub fn get(&self, pool: PoolName) -> f64 {
        match pool {
            PoolName::Sga => self.sga,
            PoolName::Data => self.data,
            PoolName::Workplace => self.workplace,
        }
    }
}

/// One allocation row per (eligible code, pool) pair. Zero amounts are
/// recorded for SGA; DATA/WORKPLACE rows exist only for tagged codes.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub contract_code: String,
    pub pool: PoolName,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolDetail {
    pub name: PoolName,
    pub total: f64,
    pub revenue_base: f64,
    pub eligible_codes: usize,
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RevenueCenterRow {
    pub contract_code: String,
    pub project_name: String,
    pub category: String,
    pub allocation_tag: AllocationTag,
    pub revenue: f64,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub sga_allocation: f64,
    pub data_allocation: f64,
    pub workplace_allocation: f64,
    pub margin: f64,
    /// Omitted when revenue is zero; never NaN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostCenterRow {
    pub contract_code: String,
    pub description: String,
    pub pool: PoolName,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NonRevenueRow {
    pub contract_code: String,
    pub project_name: String,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
}

// ---------------------------------------------------------------------------
// Validation trail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrailEntry {
    pub check: String,
    pub status: CheckStatus,
    pub detail: String,
}

/// Ordered audit trail. Advisory findings accumulate here across every
/// stage; FAIL entries always coincide with an aborted run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationTrail {
    pub entries: Vec<TrailEntry>,
}

impl ValidationTrail {
    pub fn pass(&mut self, check: &str, detail: impl Into<String>) {
        self.entries.push(TrailEntry {
            check: check.into(),
            status: CheckStatus::Pass,
            detail: detail.into(),
        });
    }

    pub fn warn(&mut self, check: &str, detail: impl Into<String>) {
        self.entries.push(TrailEntry {
            check: check.into(),
            status: CheckStatus::Warn,
            detail: detail.into(),
        });
    }

    pub fn fail(&mut self, check: &str, detail: impl Into<String>) {
        self.entries.push(TrailEntry {
            check: check.into(),
            status: CheckStatus::Fail,
            detail: detail.into(),
        });
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.status == CheckStatus::Fail)
    }

    pub fn summary(&self) -> String {
        format!(
            "PASS: {} | WARN: {} | FAIL: {}",
            self.count(CheckStatus::Pass),
            self.count(CheckStatus::Warn),
            self.count(CheckStatus::Fail),
        )
    }
}

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub month: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub revenue_centers: Vec<RevenueCenterRow>,
    pub cost_centers: Vec<CostCenterRow>,
    pub non_revenue_clients: Vec<NonRevenueRow>,
    pub allocations: Vec<Allocation>,
    pub pools: Vec<PoolDetail>,
    pub accounts: Vec<BucketedAccount>,
    pub trail: ValidationTrail,
}
