//! Client for the `AppLovin` MAX reporting API.
//!
//! Two report families are fetched: per-app user-level ad revenue (a JSON
//! envelope pointing at a short-lived CSV download) and account-wide
//! aggregate revenue (CSV served directly). Downloaded reports come back as
//! normalized [`adrev_core`] records ready for the warehouse.

mod client;
mod error;
mod normalize;
mod parse;
mod retry;
mod types;

pub use client::ReportClient;
pub use error::FetchError;
pub use normalize::{normalize_aggregate, normalize_user_level};
pub use parse::RawReport;
pub use retry::RetryPolicy;
pub use types::{UserReportPointer, UserReportRequest};
