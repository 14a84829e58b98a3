//! Mapping of decoded CSV reports onto canonical warehouse records.
//!
//! `report_date`, `application`, and `platform` are always taken from the
//! request that produced the batch, never from row content, so one batch can
//! never straddle partitions. Unknown columns are preserved verbatim in the
//! record's `extra` map instead of being dropped.

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};

use adrev_core::{
    AggregateMetrics, AggregateRecord, DataSource, QueryType, UserDataKind, UserLevelRecord,
};

use crate::error::FetchError;
use crate::parse::{lenient_f64, lenient_i64, parse_timestamp, RawReport};
use crate::types::UserReportRequest;

/// Header synonyms for user-level fields. The upstream has shipped both
/// spellings of each over time.
const TIMESTAMP_COLUMNS: &[&str] = &["date", "timestamp"];
const AD_UNIT_ID_COLUMNS: &[&str] = &["ad_unit_id", "max_ad_unit_id"];
const PLACEMENT_COLUMNS: &[&str] = &["placement", "max_placement"];
const REVENUE_COLUMNS: &[&str] = &["revenue", "estimated_revenue"];

const IMPRESSIONS_COLUMN: &str = "impressions";

/// Normalized headers that map onto canonical [`UserLevelRecord`] fields.
/// Anything else lands in the `extra` passthrough map.
fn is_known_user_column(header: &str) -> bool {
    matches!(
        header,
        "date"
            | "timestamp"
            | "ad_unit_id"
            | "max_ad_unit_id"
            | "ad_unit_name"
            | "waterfall"
            | "ad_format"
            | "placement"
            | "max_placement"
            | "ad_placement"
            | "network"
            | "country"
            | "device_type"
            | "idfa"
            | "idfv"
            | "user_id"
            | "custom_data"
            | "revenue"
            | "estimated_revenue"
            | "impressions"
    )
}

/// Normalizes a user-level report batch.
///
/// The batch granularity ([`UserDataKind`]) is decided once from the report
/// shape: an `impressions` column means the upstream served the per-user
/// aggregated variant. Numeric fields parse leniently to zero; timestamps
/// that fail to parse become `None`.
#[must_use]
pub fn normalize_user_level(
    report: &RawReport,
    request: &UserReportRequest,
    data_source: DataSource,
) -> Vec<UserLevelRecord> {
    let loaded_at = Utc::now();
    let user_aggregated = report.has_column(IMPRESSIONS_COLUMN);
    let extra_headers: Vec<&str> = report
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|h| !is_known_user_column(h))
        .collect();

    report
        .rows()
        .map(|row| {
            let kind = if user_aggregated {
                UserDataKind::UserAggregated {
                    impressions: lenient_i64(row.get(IMPRESSIONS_COLUMN)),
                }
            } else {
                UserDataKind::Impression
            };

            let mut extra = Map::new();
            for header in &extra_headers {
                if let Some(value) = row.get(header) {
                    extra.insert((*header).to_owned(), Value::String(value.to_owned()));
                }
            }

            UserLevelRecord {
                report_date: request.date,
                application: request.application.clone(),
                package_name: request.application.clone(),
                platform: request.platform,
                impression_timestamp: row.first_of(TIMESTAMP_COLUMNS).and_then(parse_timestamp),
                ad_unit_id: owned(row.first_of(AD_UNIT_ID_COLUMNS)),
                ad_unit_name: owned(row.get("ad_unit_name")),
                waterfall: owned(row.get("waterfall")),
                ad_format: owned(row.get("ad_format")),
                placement: owned(row.first_of(PLACEMENT_COLUMNS)),
                ad_placement: owned(row.get("ad_placement")),
                network: owned(row.get("network")),
                country: owned(row.get("country")),
                device_type: owned(row.get("device_type")),
                idfa: owned(row.get("idfa")),
                idfv: owned(row.get("idfv")),
                user_id: owned(row.get("user_id")),
                custom_data: owned(row.get("custom_data")),
                revenue: lenient_f64(row.first_of(REVENUE_COLUMNS)),
                kind,
                data_source,
                extra,
                loaded_at,
            }
        })
        .collect()
}

/// Normalizes an aggregate report batch.
///
/// `report_date` comes from the request, but the report must still carry the
/// `day` column it was keyed on upstream; its absence means the endpoint
/// served something other than the expected projection.
///
/// # Errors
///
/// Returns [`FetchError::MalformedReport`] when the `day` column is missing.
pub fn normalize_aggregate(
    report: &RawReport,
    report_date: NaiveDate,
    query_type: QueryType,
    context: &str,
) -> Result<Vec<AggregateRecord>, FetchError> {
    if !report.has_column("day") {
        return Err(FetchError::MalformedReport {
            context: context.to_owned(),
            reason: "expected column 'day' is missing".to_owned(),
        });
    }

    let loaded_at = Utc::now();
    let records = report
        .rows()
        .map(|row| {
            let metrics = match query_type {
                QueryType::Basic => AggregateMetrics::Basic {
                    requests: lenient_i64(row.get("requests")),
                },
                QueryType::Network => AggregateMetrics::Network {
                    attempts: lenient_i64(row.get("attempts")),
                    responses: lenient_i64(row.get("responses")),
                    fill_rate: lenient_f64(row.get("fill_rate")),
                },
            };

            AggregateRecord {
                report_date,
                application: owned(row.get("application")),
                package_name: owned(row.get("package_name")),
                platform: owned(row.get("platform")),
                country: owned(row.get("country")),
                device_type: owned(row.get("device_type")),
                ad_format: owned(row.get("ad_format")),
                ad_unit_id: owned(row.first_of(AD_UNIT_ID_COLUMNS)),
                placement: owned(row.first_of(PLACEMENT_COLUMNS)),
                network: owned(row.get("network")),
                network_placement: owned(row.get("network_placement")),
                impressions: lenient_i64(row.get("impressions")),
                estimated_revenue: lenient_f64(row.first_of(REVENUE_COLUMNS)),
                ecpm: lenient_f64(row.get("ecpm")),
                metrics,
                loaded_at,
            }
        })
        .collect();

    Ok(records)
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrev_core::Platform;

    fn request(aggregated: bool) -> UserReportRequest {
        UserReportRequest {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            platform: Platform::Android,
            application: "com.example.puzzle".to_owned(),
            aggregated,
        }
    }

    fn parse(body: &str) -> RawReport {
        RawReport::parse(body, "test").unwrap()
    }

    #[test]
    fn user_level_maps_canonical_columns() {
        let body = "Date,Ad Unit ID,Ad Unit Name,Waterfall,Ad Format,Placement,Network,Country,\
                    Device Type,IDFA,IDFV,User ID,Custom Data,Revenue,Ad Placement\n\
                    2024-01-10 01:02:03,unit-1,Banner Main,default,BANNER,home,AdColony,us,\
                    phone,ifa-1,ifv-1,user-9,extra,0.0042,slot-a\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::FullReportUrl);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.report_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(r.application, "com.example.puzzle");
        assert_eq!(r.package_name, "com.example.puzzle");
        assert_eq!(r.platform, Platform::Android);
        assert_eq!(
            r.impression_timestamp.unwrap().to_string(),
            "2024-01-10 01:02:03"
        );
        assert_eq!(r.ad_unit_id.as_deref(), Some("unit-1"));
        assert_eq!(r.ad_unit_name.as_deref(), Some("Banner Main"));
        assert_eq!(r.waterfall.as_deref(), Some("default"));
        assert_eq!(r.placement.as_deref(), Some("home"));
        assert_eq!(r.ad_placement.as_deref(), Some("slot-a"));
        assert_eq!(r.network.as_deref(), Some("AdColony"));
        assert_eq!(r.country.as_deref(), Some("us"));
        assert_eq!(r.idfa.as_deref(), Some("ifa-1"));
        assert_eq!(r.user_id.as_deref(), Some("user-9"));
        assert!((r.revenue - 0.0042).abs() < f64::EPSILON);
        assert_eq!(r.kind, UserDataKind::Impression);
        assert_eq!(r.data_source, DataSource::FullReportUrl);
        assert!(r.extra.is_empty());
    }

    #[test]
    fn user_level_kind_follows_impressions_column() {
        let body = "Date,Revenue,Impressions\n2024-01-10,1.5,12\n2024-01-10,0.5,3\n";
        let records = normalize_user_level(&parse(body), &request(true), DataSource::GenericUrl);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].kind,
            UserDataKind::UserAggregated { impressions: 12 }
        );
        assert_eq!(records[0].kind.data_type(), "user_aggregated");
        assert_eq!(
            records[1].kind,
            UserDataKind::UserAggregated { impressions: 3 }
        );
    }

    #[test]
    fn user_level_without_impressions_column_is_impression_kind() {
        let body = "Date,Revenue\n2024-01-10,1.5\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::GenericUrl);
        assert_eq!(records[0].kind, UserDataKind::Impression);
        assert_eq!(records[0].kind.data_type(), "impression");
    }

    #[test]
    fn user_level_synonym_headers_map_to_same_fields() {
        let body = "Timestamp,MAX Ad Unit ID,MAX Placement,Estimated Revenue\n\
                    2024-01-10 08:00:00,unit-9,home,0.31\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::GenericUrl);
        let r = &records[0];
        assert!(r.impression_timestamp.is_some());
        assert_eq!(r.ad_unit_id.as_deref(), Some("unit-9"));
        assert_eq!(r.placement.as_deref(), Some("home"));
        assert!((r.revenue - 0.31).abs() < f64::EPSILON);
    }

    #[test]
    fn user_level_bad_numerics_and_timestamps_are_lenient() {
        let body = "Date,Revenue\nnot-a-date,not-a-number\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::GenericUrl);
        let r = &records[0];
        assert_eq!(r.impression_timestamp, None);
        assert!((r.revenue - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn user_level_missing_strings_are_none() {
        let body = "Date,Revenue,Network\n2024-01-10,0.5,\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::GenericUrl);
        let r = &records[0];
        assert_eq!(r.network, None);
        assert_eq!(r.idfa, None);
        assert_eq!(r.custom_data, None);
    }

    #[test]
    fn user_level_unknown_columns_pass_through() {
        let body = "Date,Revenue,Mediation Group\n2024-01-10,0.5,group-7\n";
        let records = normalize_user_level(&parse(body), &request(false), DataSource::GenericUrl);
        let r = &records[0];
        assert_eq!(
            r.extra.get("mediation_group").and_then(|v| v.as_str()),
            Some("group-7")
        );
    }

    #[test]
    fn aggregate_basic_maps_requests() {
        let body = "day,application,package_name,platform,country,device_type,ad_format,\
                    max_ad_unit_id,max_placement,network,network_placement,impressions,\
                    estimated_revenue,ecpm,requests\n\
                    2024-01-10,Puzzle,com.example.puzzle,android,us,phone,BANNER,unit-1,home,\
                    AdColony,slot-1,1000,2.5,2.5,1500\n";
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records =
            normalize_aggregate(&parse(body), date, QueryType::Basic, "test").unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.report_date, date);
        assert_eq!(r.package_name.as_deref(), Some("com.example.puzzle"));
        assert_eq!(r.ad_unit_id.as_deref(), Some("unit-1"));
        assert_eq!(r.placement.as_deref(), Some("home"));
        assert_eq!(r.network_placement.as_deref(), Some("slot-1"));
        assert_eq!(r.impressions, 1000);
        assert_eq!(r.metrics, AggregateMetrics::Basic { requests: 1500 });
        assert_eq!(r.metrics.query_type(), QueryType::Basic);
    }

    #[test]
    fn aggregate_network_maps_fill_metrics() {
        let body = "day,network,impressions,estimated_revenue,ecpm,attempts,responses,fill_rate\n\
                    2024-01-10,Mintegral,500,1.25,2.5,800,650,0.8125\n";
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records =
            normalize_aggregate(&parse(body), date, QueryType::Network, "test").unwrap();
        let r = &records[0];
        assert_eq!(
            r.metrics,
            AggregateMetrics::Network {
                attempts: 800,
                responses: 650,
                fill_rate: 0.8125,
            }
        );
        assert_eq!(r.metrics.query_type(), QueryType::Network);
    }

    #[test]
    fn aggregate_missing_day_column_is_malformed() {
        let body = "application,impressions\ncom.example.puzzle,100\n";
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let err = normalize_aggregate(&parse(body), date, QueryType::Basic, "test").unwrap_err();
        assert!(matches!(err, FetchError::MalformedReport { .. }));
        assert!(err.to_string().contains("day"));
    }

    #[test]
    fn aggregate_report_date_comes_from_request_not_rows() {
        let body = "day,impressions,estimated_revenue,ecpm,requests\n2023-12-31,10,0.1,1.0,20\n";
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records =
            normalize_aggregate(&parse(body), date, QueryType::Basic, "test").unwrap();
        assert_eq!(records[0].report_date, date);
    }
}
