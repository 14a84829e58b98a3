//! CSV decoding and header normalization for report bodies.
//!
//! Upstream header casing and spacing are not contractually stable, so every
//! header is trimmed, lower-cased, and space-collapsed to underscores before
//! any field mapping happens. Cell values are trimmed; blank cells read as
//! absent.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;

use crate::error::FetchError;

/// A decoded CSV report with normalized headers.
#[derive(Debug)]
pub struct RawReport {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl RawReport {
    /// Decodes a CSV body. A header-only (or entirely empty) body decodes to
    /// an empty report; a body whose records cannot be read at all is
    /// malformed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedReport`] if the CSV reader rejects the
    /// header row or any record.
    pub fn parse(body: &str, context: &str) -> Result<Self, FetchError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(body.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FetchError::MalformedReport {
                context: context.to_owned(),
                reason: format!("unreadable header row: {e}"),
            })?
            .iter()
            .map(normalize_header)
            .collect();

        // First occurrence wins when the upstream repeats a header.
        let mut index = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            index.entry(header.clone()).or_insert(i);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| FetchError::MalformedReport {
                context: context.to_owned(),
                reason: format!("unreadable record: {e}"),
            })?;
            rows.push(record);
        }

        Ok(Self {
            headers,
            index,
            rows,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether a normalized header is present.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |record| Row {
            report: self,
            record,
        })
    }
}

/// One data row bound to its report's header index.
pub(crate) struct Row<'a> {
    report: &'a RawReport,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    /// Returns the trimmed cell under `column`, or `None` when the column is
    /// absent, the row is short, or the cell is blank.
    pub(crate) fn get(&self, column: &str) -> Option<&str> {
        let idx = *self.report.index.get(column)?;
        let value = self.record.get(idx)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// First non-blank cell among `columns`, in order.
    pub(crate) fn first_of(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }
}

/// Canonical form of an upstream header: trimmed, lower-cased, runs of
/// whitespace collapsed to a single underscore.
#[must_use]
pub(crate) fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Lenient numeric parse: unparsable or missing values become `0.0` rather
/// than failing the batch.
#[must_use]
pub(crate) fn lenient_f64(value: Option<&str>) -> f64 {
    value.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0)
}

/// Lenient integer parse. Accepts a plain integer or a float rendering of
/// one ("12.0"); anything else becomes `0`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn lenient_i64(value: Option<&str>) -> i64 {
    value
        .and_then(|v| {
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().map(|f| f as i64))
        })
        .unwrap_or(0)
}

/// Parses the user-level timestamp column. The upstream emits either
/// `YYYY-MM-DD HH:MM:SS` or a bare date; anything else is `None`.
#[must_use]
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
