//! HTTP client for the MAX reporting endpoints.
//!
//! The user-level report is fetched in two stages: a metadata call that
//! returns a JSON envelope pointing at a CSV, then the CSV download itself.
//! Download links expire within about an hour, so the download happens
//! immediately and on a separate client with a longer timeout. Aggregate
//! reports are a single CSV response.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};

use adrev_core::{AggregateRecord, AppConfig, QueryType, UserLevelRecord};

use crate::error::FetchError;
use crate::normalize::{normalize_aggregate, normalize_user_level};
use crate::parse::RawReport;
use crate::retry::{with_policy, RetryPolicy};
use crate::types::{UserReportPointer, UserReportRequest};

const DEFAULT_BASE_URL: &str = "https://r.applovin.com/";
const USER_REPORT_PATH: &str = "max/userAdRevenueReport";
const AGGREGATE_REPORT_PATH: &str = "maxReport";

/// Column projection requested for the basic aggregate report.
const BASIC_REPORT_COLUMNS: &str = "day,application,package_name,platform,country,device_type,\
                                    ad_format,max_ad_unit_id,max_placement,network,\
                                    network_placement,impressions,estimated_revenue,ecpm,requests";

/// Column projection requested for the per-network aggregate report.
const NETWORK_REPORT_COLUMNS: &str = "day,application,package_name,platform,country,device_type,\
                                      ad_format,max_ad_unit_id,max_placement,network,\
                                      network_placement,impressions,estimated_revenue,ecpm,\
                                      attempts,responses,fill_rate";

/// Client for the MAX reporting API.
///
/// Use [`ReportClient::new`] (or [`ReportClient::from_app_config`]) for
/// production, or [`ReportClient::with_base_url`] to point at a mock server
/// in tests. All fetches retry transient failures per the injected
/// [`RetryPolicy`] and return `Ok(None)` when the upstream legitimately has
/// no data for the requested day.
pub struct ReportClient {
    /// Metadata and aggregate calls.
    client: Client,
    /// CSV downloads; longer timeout because report bodies can be large.
    download_client: Client,
    api_key: String,
    user_report_endpoint: Url,
    aggregate_report_endpoint: Url,
    policy: RetryPolicy,
}

impl ReportClient {
    /// Creates a client pointed at the production reporting API.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        report_timeout_secs: u64,
        download_timeout_secs: u64,
        user_agent: &str,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        Self::with_base_url(
            api_key,
            report_timeout_secs,
            download_timeout_secs,
            user_agent,
            policy,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FetchError> {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            rate_limit_delay: Duration::from_secs(config.rate_limit_delay_secs),
            server_error_delay: Duration::from_secs(config.server_error_delay_secs),
        };
        Self::new(
            &config.applovin_api_key,
            config.report_timeout_secs,
            config.download_timeout_secs,
            &config.http_user_agent,
            policy,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FetchError::InvalidBaseUrl`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        report_timeout_secs: u64,
        download_timeout_secs: u64,
        user_agent: &str,
        policy: RetryPolicy,
        base_url: &str,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(report_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        let download_client = Client::builder()
            .timeout(Duration::from_secs(download_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: exactly one trailing slash so joins append path segments
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parse = |path: &str| -> Result<Url, FetchError> {
            Url::parse(&normalised)
                .and_then(|base| base.join(path))
                .map_err(|e| FetchError::InvalidBaseUrl {
                    url: base_url.to_owned(),
                    reason: e.to_string(),
                })
        };

        Ok(Self {
            client,
            download_client,
            api_key: api_key.to_owned(),
            user_report_endpoint: parse(USER_REPORT_PATH)?,
            aggregate_report_endpoint: parse(AGGREGATE_REPORT_PATH)?,
            policy,
        })
    }

    /// Fetches and normalizes one user-level report.
    ///
    /// Returns `Ok(None)` when the metadata envelope carries no download
    /// pointer or the CSV has zero data rows; both mean the upstream has
    /// nothing for this (date, platform, application).
    ///
    /// # Errors
    ///
    /// - [`FetchError::Auth`] on 401/403 (not retried).
    /// - [`FetchError::RateLimited`] / [`FetchError::Server`] after retries
    ///   are exhausted.
    /// - [`FetchError::UnexpectedStatus`] on any other non-2xx (not retried).
    /// - [`FetchError::Deserialize`] if the envelope is not valid JSON.
    /// - [`FetchError::MalformedReport`] if the pointer URL or CSV body is
    ///   unusable.
    pub async fn fetch_user_level(
        &self,
        request: &UserReportRequest,
    ) -> Result<Option<Vec<UserLevelRecord>>, FetchError> {
        let context = format!(
            "userAdRevenueReport({}, {}, {})",
            request.date, request.platform, request.application
        );
        let url = self.user_report_url(request);

        let body = with_policy(self.policy, || {
            let url = url.clone();
            let context = context.clone();
            async move { Self::request_text(&self.client, url, &context).await }
        })
        .await?;

        let pointer: UserReportPointer =
            serde_json::from_str(&body).map_err(|e| FetchError::Deserialize {
                context: context.clone(),
                source: e,
            })?;

        let Some((data_source, report_url)) = pointer.select() else {
            tracing::info!(
                application = %request.application,
                platform = %request.platform,
                date = %request.date,
                "user-level envelope has no report pointer, treating as no data"
            );
            return Ok(None);
        };

        let report_url = Url::parse(report_url).map_err(|e| FetchError::MalformedReport {
            context: context.clone(),
            reason: format!("unparsable report URL: {e}"),
        })?;

        // The pointer is short-lived; download now, on the long-timeout client.
        let download_context = format!("{context} download");
        let body = with_policy(self.policy, || {
            let url = report_url.clone();
            let context = download_context.clone();
            async move { Self::request_text(&self.download_client, url, &context).await }
        })
        .await?;

        let report = RawReport::parse(&body, &context)?;
        if report.is_empty() {
            tracing::info!(
                application = %request.application,
                platform = %request.platform,
                date = %request.date,
                "user-level report has zero rows"
            );
            return Ok(None);
        }

        let records = normalize_user_level(&report, request, data_source);
        tracing::debug!(
            rows = records.len(),
            data_source = %data_source,
            application = %request.application,
            "downloaded user-level report"
        );
        Ok(Some(records))
    }

    /// Fetches the account-wide basic aggregate report for one day.
    ///
    /// Returns `Ok(None)` when the report has zero data rows.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ReportClient::fetch_user_level`], minus the
    /// envelope stage.
    pub async fn fetch_aggregate_basic(
        &self,
        date: NaiveDate,
    ) -> Result<Option<Vec<AggregateRecord>>, FetchError> {
        self.fetch_aggregate(date, QueryType::Basic, BASIC_REPORT_COLUMNS)
            .await
    }

    /// Fetches the per-network aggregate report for one day.
    ///
    /// Returns `Ok(None)` when the report has zero data rows.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ReportClient::fetch_aggregate_basic`].
    pub async fn fetch_aggregate_network(
        &self,
        date: NaiveDate,
    ) -> Result<Option<Vec<AggregateRecord>>, FetchError> {
        self.fetch_aggregate(date, QueryType::Network, NETWORK_REPORT_COLUMNS)
            .await
    }

    async fn fetch_aggregate(
        &self,
        date: NaiveDate,
        query_type: QueryType,
        columns: &str,
    ) -> Result<Option<Vec<AggregateRecord>>, FetchError> {
        let context = format!("maxReport({date}, {query_type})");
        let url = self.aggregate_report_url(date, columns);

        let body = with_policy(self.policy, || {
            let url = url.clone();
            let context = context.clone();
            async move { Self::request_text(&self.client, url, &context).await }
        })
        .await?;

        let report = RawReport::parse(&body, &context)?;
        if report.is_empty() {
            tracing::info!(date = %date, query_type = %query_type, "aggregate report has zero rows");
            return Ok(None);
        }

        let records = normalize_aggregate(&report, date, query_type, &context)?;
        tracing::debug!(rows = records.len(), query_type = %query_type, "downloaded aggregate report");
        Ok(Some(records))
    }

    /// Builds the user-level metadata URL with percent-encoded parameters.
    fn user_report_url(&self, request: &UserReportRequest) -> Url {
        let mut url = self.user_report_endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("date", &request.date.to_string());
            pairs.append_pair("platform", request.platform.as_str());
            pairs.append_pair("application", &request.application);
            pairs.append_pair("aggregated", if request.aggregated { "true" } else { "false" });
        }
        url
    }

    /// Builds the aggregate report URL. `start` and `end` are both set to the
    /// report date; zero rows are filtered server-side via `not_zero`.
    fn aggregate_report_url(&self, date: NaiveDate, columns: &str) -> Url {
        let date = date.to_string();
        let mut url = self.aggregate_report_endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("start", &date);
            pairs.append_pair("end", &date);
            pairs.append_pair("columns", columns);
            pairs.append_pair("format", "csv");
            pairs.append_pair("not_zero", "1");
        }
        url
    }

    /// Sends a GET request, maps the status onto the error taxonomy, and
    /// returns the body text.
    async fn request_text(client: &Client, url: Url, context: &str) -> Result<String, FetchError> {
        let response = client.get(url).send().await?;
        Self::check_status(response.status(), context)?;
        Ok(response.text().await?)
    }

    fn check_status(status: StatusCode, context: &str) -> Result<(), FetchError> {
        if status.is_success() {
            return Ok(());
        }
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Auth {
                status: status.as_u16(),
                context: context.to_owned(),
            },
            StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
                context: context.to_owned(),
            },
            s if s.is_server_error() => FetchError::Server {
                status: s.as_u16(),
                context: context.to_owned(),
            },
            s => FetchError::UnexpectedStatus {
                status: s.as_u16(),
                context: context.to_owned(),
            },
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
