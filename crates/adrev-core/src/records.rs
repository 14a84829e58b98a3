use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::apps::Platform;

/// Which pointer field of the user-level report envelope yielded the CSV.
///
/// Recorded on every row so a load can be traced back to the exact report
/// variant the upstream served that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    FullReportUrl,
    GenericUrl,
    EstimatedRevenueUrl,
}

impl DataSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::FullReportUrl => "full-report-url",
            DataSource::GenericUrl => "generic-url",
            DataSource::EstimatedRevenueUrl => "estimated-revenue-url",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate report variant. Both variants land in the same warehouse table
/// and are told apart (and gated) by this discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Basic,
    Network,
}

impl QueryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Basic => "basic",
            QueryType::Network => "network",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity of a user-level report batch.
///
/// The upstream serves either one row per impression or one row per user;
/// the shape is decided per batch from the presence of an impressions
/// column, never per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserDataKind {
    Impression,
    UserAggregated { impressions: i64 },
}

impl UserDataKind {
    /// Warehouse discriminator string.
    #[must_use]
    pub fn data_type(self) -> &'static str {
        match self {
            UserDataKind::Impression => "impression",
            UserDataKind::UserAggregated { .. } => "user_aggregated",
        }
    }

    /// Impression count, only present for user-aggregated rows.
    #[must_use]
    pub fn impressions(self) -> Option<i64> {
        match self {
            UserDataKind::Impression => None,
            UserDataKind::UserAggregated { impressions } => Some(impressions),
        }
    }
}

/// One normalized row of the per-app user-level report.
///
/// `report_date`, `application` and `platform` always come from the request
/// that produced the batch, never from row content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLevelRecord {
    pub report_date: NaiveDate,
    pub application: String,
    pub package_name: String,
    pub platform: Platform,
    pub impression_timestamp: Option<NaiveDateTime>,
    pub ad_unit_id: Option<String>,
    pub ad_unit_name: Option<String>,
    pub waterfall: Option<String>,
    pub ad_format: Option<String>,
    pub placement: Option<String>,
    pub ad_placement: Option<String>,
    pub network: Option<String>,
    pub country: Option<String>,
    pub device_type: Option<String>,
    pub idfa: Option<String>,
    pub idfv: Option<String>,
    pub user_id: Option<String>,
    pub custom_data: Option<String>,
    pub revenue: f64,
    pub kind: UserDataKind,
    pub data_source: DataSource,
    /// Columns the upstream added that have no canonical field; preserved
    /// verbatim so schema drift never drops data.
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub loaded_at: DateTime<Utc>,
}

/// Variant-specific metrics of an aggregate report row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AggregateMetrics {
    Basic {
        requests: i64,
    },
    Network {
        attempts: i64,
        responses: i64,
        fill_rate: f64,
    },
}

impl AggregateMetrics {
    #[must_use]
    pub fn query_type(self) -> QueryType {
        match self {
            AggregateMetrics::Basic { .. } => QueryType::Basic,
            AggregateMetrics::Network { .. } => QueryType::Network,
        }
    }
}

/// One normalized row of the account-wide aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub report_date: NaiveDate,
    pub application: Option<String>,
    pub package_name: Option<String>,
    pub platform: Option<String>,
    pub country: Option<String>,
    pub device_type: Option<String>,
    pub ad_format: Option<String>,
    pub ad_unit_id: Option<String>,
    pub placement: Option<String>,
    pub network: Option<String>,
    pub network_placement: Option<String>,
    pub impressions: i64,
    pub estimated_revenue: f64,
    pub ecpm: f64,
    pub metrics: AggregateMetrics,
    pub loaded_at: DateTime<Utc>,
}
