//! `marginflow-engine` — Monthly cost-waterfall classification and overhead
//! allocation engine.
//!
//! Pure engine crate: receives pre-loaded normalized tables, returns
//! classified, costed, and allocated results plus a validation trail.
//! No CLI or presentation dependencies.

pub mod aggregate;
pub mod allocate;
pub mod classify;
pub mod config;
pub mod costs;
pub mod engine;
pub mod error;
pub mod margins;
pub mod model;
pub mod normalize;
pub mod pools;
pub mod rates;
pub mod validate;

pub use config::EngineConfig;
pub use engine::run;
pub use error::{EngineError, Fatal};
pub use model::{EngineInput, ReportingMonth, RunResult};
