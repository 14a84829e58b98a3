use chrono::NaiveDate;
use serde::Deserialize;

use adrev_core::{DataSource, Platform};

/// Parameters for one user-level report fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReportRequest {
    pub date: NaiveDate,
    pub platform: Platform,
    /// Package name or bundle identifier, as registered with MAX.
    pub application: String,
    /// Request the per-user aggregated report instead of raw impressions.
    pub aggregated: bool,
}

/// JSON envelope returned by the user-level endpoint.
///
/// The endpoint answers with zero or more pointer fields naming a short-lived
/// CSV download. Which field is populated varies by account and report
/// variant; [`UserReportPointer::select`] picks one by fixed priority.
#[derive(Debug, Default, Deserialize)]
pub struct UserReportPointer {
    #[serde(default)]
    pub ad_revenue_report_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub estimated_revenue_report_url: Option<String>,
}

impl UserReportPointer {
    /// Picks the download URL, preferring the full report over the generic
    /// pointer over the estimate. Blank strings count as absent. Returns
    /// `None` when the envelope carries no usable pointer, which the caller
    /// treats as "no data for this day".
    #[must_use]
    pub fn select(&self) -> Option<(DataSource, &str)> {
        let candidates = [
            (DataSource::FullReportUrl, &self.ad_revenue_report_url),
            (DataSource::GenericUrl, &self.url),
            (DataSource::EstimatedRevenueUrl, &self.estimated_revenue_report_url),
        ];
        candidates.into_iter().find_map(|(source, field)| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| (source, u))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_prefers_full_report_url() {
        let pointer = UserReportPointer {
            ad_revenue_report_url: Some("https://cdn.example/full.csv".to_owned()),
            url: Some("https://cdn.example/generic.csv".to_owned()),
            estimated_revenue_report_url: Some("https://cdn.example/estimate.csv".to_owned()),
        };
        let (source, url) = pointer.select().unwrap();
        assert_eq!(source, DataSource::FullReportUrl);
        assert_eq!(url, "https://cdn.example/full.csv");
    }

    #[test]
    fn select_falls_back_to_generic_url() {
        let pointer = UserReportPointer {
            ad_revenue_report_url: None,
            url: Some("https://cdn.example/generic.csv".to_owned()),
            estimated_revenue_report_url: Some("https://cdn.example/estimate.csv".to_owned()),
        };
        let (source, _) = pointer.select().unwrap();
        assert_eq!(source, DataSource::GenericUrl);
    }

    #[test]
    fn select_falls_back_to_estimate() {
        let pointer = UserReportPointer {
            ad_revenue_report_url: None,
            url: None,
            estimated_revenue_report_url: Some("https://cdn.example/estimate.csv".to_owned()),
        };
        let (source, _) = pointer.select().unwrap();
        assert_eq!(source, DataSource::EstimatedRevenueUrl);
    }

    #[test]
    fn select_returns_none_for_empty_envelope() {
        assert!(UserReportPointer::default().select().is_none());
    }

    #[test]
    fn select_treats_blank_pointer_as_absent() {
        let pointer = UserReportPointer {
            ad_revenue_report_url: Some("   ".to_owned()),
            url: Some("https://cdn.example/generic.csv".to_owned()),
            estimated_revenue_report_url: None,
        };
        let (source, _) = pointer.select().unwrap();
        assert_eq!(source, DataSource::GenericUrl);
    }

    #[test]
    fn envelope_deserializes_with_unknown_fields() {
        let json = r#"{"status": 200, "url": "https://cdn.example/r.csv"}"#;
        let pointer: UserReportPointer = serde_json::from_str(json).unwrap();
        assert_eq!(pointer.select().unwrap().0, DataSource::GenericUrl);
    }
}
