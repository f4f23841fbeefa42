//! Time ordering and loading of sensor series.

use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::device::models::Series;
use crate::error::AppResult;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"];

/// Parse a station timestamp into something comparable.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (the firmware format), the ISO `T` variant,
/// RFC 3339, bare `HH:MM:SS` and epoch seconds.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }

    if let Ok(time) = chrono::NaiveTime::parse_from_str(raw, "%H:%M:%S") {
        return NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(time));
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// Sort a series ascending by timestamp, moving every column with it.
///
/// The sort is stable. Timestamps that do not parse keep their relative
/// order and go after all parseable ones.
///
/// # Errors
///
/// Returns `AppError::Malformed` if the columns are not aligned; the series is
/// left untouched in that case.
pub fn sort_by_timestamp(series: &mut Series) -> AppResult<()> {
    series.check_aligned()?;

    let keys: Vec<Option<NaiveDateTime>> = series
        .timestamps
        .iter()
        .map(|ts| parse_timestamp(ts))
        .collect();

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| (keys[i].is_none(), keys[i]));

    if order.iter().enumerate().all(|(pos, &i)| pos == i) {
        return Ok(());
    }

    series.timestamps = permute(&series.timestamps, &order);
    for column in series.columns_mut() {
        *column = permute(column, &order);
    }
    Ok(())
}

fn permute<T: Clone>(values: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| values[i].clone()).collect()
}

/// Whether the parseable timestamps of a series are non-decreasing.
#[must_use]
pub fn is_time_ordered(series: &Series) -> bool {
    let keys: Vec<NaiveDateTime> = series
        .timestamps
        .iter()
        .filter_map(|ts| parse_timestamp(ts))
        .collect();
    keys.windows(2).all(|w| w[0] <= w[1])
}

/// One row of the station's log file.
#[derive(Debug, Deserialize)]
struct LogRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Pressure1 (bar)")]
    pressure1: f64,
    #[serde(rename = "Pressure2 (bar)")]
    pressure2: f64,
    #[serde(rename = "Pressure3 (bar)")]
    pressure3: f64,
    #[serde(rename = "Pressure4 (bar)")]
    pressure4: f64,
    #[serde(rename = "FlowRate1 (L/min)")]
    flow_rate1: f64,
    #[serde(rename = "FlowRate2 (L/min)")]
    flow_rate2: f64,
}

/// Load a downloaded log CSV into a series.
///
/// Cumulative flow columns are ignored; charts plot the flow rate.
///
/// # Errors
///
/// Returns `AppError::Csv` if the header or a row does not match the log layout.
pub fn from_log_csv<R: Read>(reader: R) -> AppResult<Series> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut series = Series::default();
    for row in csv_reader.deserialize::<LogRow>() {
        let row = row?;
        series.push(
            row.timestamp,
            [row.pressure1, row.pressure2, row.pressure3, row.pressure4],
            [row.flow_rate1, row.flow_rate2],
        );
    }

    tracing::debug!(samples = series.len(), "Loaded log CSV");
    Ok(series)
}
