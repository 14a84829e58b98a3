//! Run accounting surfaced to operators.
//!
//! Every fetch-and-load attempt lands in exactly one [`LoadOutcome`]; the
//! daily and backfill drivers aggregate those into serializable reports that
//! the CLI prints and the server returns from its run endpoints.

use adrev_core::Platform;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Terminal state of one fetch-and-load attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Rows were written to the warehouse.
    Loaded { rows: u64 },
    /// The partition already had rows and no force was requested.
    AlreadyPresent,
    /// The upstream had no report, or an empty one, for the day.
    Empty,
    /// The fetch or load failed after retries.
    Failed { error: String },
}

impl LoadOutcome {
    /// Loading rows and deliberately skipping both count as success; empty
    /// upstream data does not.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            LoadOutcome::Loaded { .. } | LoadOutcome::AlreadyPresent
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, LoadOutcome::Empty)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }
}

/// One app's outcome within a daily run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOutcome {
    pub platform: Platform,
    pub application: String,
    pub outcome: LoadOutcome,
}

/// Full accounting of one daily run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_date: NaiveDate,
    pub force_update: bool,
    pub apps: Vec<AppOutcome>,
    pub aggregate_basic: LoadOutcome,
    pub aggregate_network: LoadOutcome,
}

impl DailyReport {
    #[must_use]
    pub fn user_succeeded(&self) -> usize {
        self.apps.iter().filter(|a| a.outcome.is_success()).count()
    }

    #[must_use]
    pub fn user_no_data(&self) -> usize {
        self.apps.iter().filter(|a| a.outcome.is_empty()).count()
    }

    #[must_use]
    pub fn user_failed(&self) -> usize {
        self.apps.iter().filter(|a| a.outcome.is_failure()).count()
    }

    /// Failed loads across apps and both aggregate variants.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        let aggregates = usize::from(self.aggregate_basic.is_failure())
            + usize::from(self.aggregate_network.is_failure());
        self.user_failed() + aggregates
    }

    #[must_use]
    pub fn aggregate_basic_ok(&self) -> bool {
        self.aggregate_basic.is_success()
    }

    #[must_use]
    pub fn aggregate_network_ok(&self) -> bool {
        self.aggregate_network.is_success()
    }

    /// A day succeeds when at least one source loaded or was already present.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.apps.iter().any(|a| a.outcome.is_success())
            || self.aggregate_basic.is_success()
            || self.aggregate_network.is_success()
    }
}

/// One day's result inside a backfill sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillDay {
    pub report_date: NaiveDate,
    pub succeeded: bool,
    pub elapsed_ms: u64,
    pub report: DailyReport,
}

/// Full accounting of a backfill sweep, oldest day first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub days: Vec<BackfillDay>,
    pub success_days: usize,
    pub failed_days: usize,
    pub elapsed_ms: u64,
}
