//! Orchestration for daily and backfill revenue ingestion runs.
//!
//! Fetching lives in `adrev-applovin` and persistence in `adrev-db`; this
//! crate owns the load-or-skip gate, the per-run accounting, and the daily
//! and backfill drivers that tie them together. Drivers never abort on a
//! single source's failure; every source lands in the returned report.

pub mod backfill;
pub mod daily;
pub mod gate;
pub mod stats;

pub use backfill::run_backfill;
pub use daily::{default_report_date, run_daily};
pub use gate::{decide, decide_for_key, GateDecision, IngestionKey};
pub use stats::{AppOutcome, BackfillDay, BackfillReport, DailyReport, LoadOutcome};
