use std::fmt;

use crate::model::PoolName;

/// A fatal finding. Fatals are collected per stage where feasible so the
/// operator sees every problem in one pass, then carried together in
/// `EngineError::Aborted`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fatal {
    /// A contract code carries both Data and Wellness tags across its rows.
    TagConflict { code: String },
    /// A code has revenue > 0 and is also explicitly configured as a cost center.
    CenterConflict { code: String },
    /// The same staff key appears more than once in compensation data.
    DuplicateStaffKey { key: String },
    /// Time entries reference staff keys with no resolvable rate.
    MissingStaffRates { keys: Vec<String> },
    /// Aggregated revenue does not match the externally supplied month total.
    RevenueTotalMismatch { calculated: f64, expected: f64 },
    /// A pool's allocations do not sum back to its total within tolerance.
    PoolMismatch { pool: PoolName, allocated: f64, total: f64 },
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagConflict { code } => {
                write!(f, "allocation tag conflict for '{code}': both Data and Wellness tags present")
            }
            Self::CenterConflict { code } => {
                write!(f, "'{code}' has revenue but is also a configured cost center")
            }
            Self::DuplicateStaffKey { key } => {
                write!(f, "duplicate staff key in compensation: '{key}'")
            }
            Self::MissingStaffRates { keys } => {
                write!(f, "staff with hours but no rate: {}", keys.join(", "))
            }
            Self::RevenueTotalMismatch { calculated, expected } => {
                write!(
                    f,
                    "revenue sum {calculated:.2} does not match supplied total {expected:.2} (diff {:.2})",
                    (calculated - expected).abs()
                )
            }
            Self::PoolMismatch { pool, allocated, total } => {
                write!(
                    f,
                    "{pool} allocations sum to {allocated:.2}, pool total is {total:.2}"
                )
            }
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad rule pattern, bad pool assignment, etc.).
    ConfigValidation(String),
    /// Missing required column in an input table.
    MissingColumn { table: String, column: String },
    /// Date parse error in an input table.
    DateParse { table: String, row: usize, value: String },
    /// Numeric parse error in an input table.
    NumberParse { table: String, row: usize, value: String },
    /// Reporting month string could not be parsed.
    InvalidMonth(String),
    /// IO error (file read, etc.).
    Io(String),
    /// The run hit one or more fatal conditions; no output was produced.
    Aborted(Vec<Fatal>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::DateParse { table, row, value } => {
                write!(f, "table '{table}', row {row}: cannot parse date '{value}'")
            }
            Self::NumberParse { table, row, value } => {
                write!(f, "table '{table}', row {row}: cannot parse number '{value}'")
            }
            Self::InvalidMonth(value) => {
                write!(f, "cannot parse reporting month '{value}' (expected e.g. 'November2025' or '2025-11')")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Aborted(fatals) => {
                write!(f, "run aborted with {} fatal finding(s):", fatals.len())?;
                for fatal in fatals {
                    write!(f, "\n  - {fatal}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for EngineError {}
