//! Tabular export of combined series

use crate::combine::{CombinedSeries, PointKind};
use crate::data::{TimeFormat, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Timelike, Utc};

/// Name of the column distinguishing observed rows from forecasted ones
pub const KIND_COLUMN: &str = "kind";

fn format_timestamp(ts: &DateTime<Utc>, date_only: bool) -> String {
    if date_only {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

/// Serialize a combined series as CSV with columns
/// `<time_column>,<value_column>,kind`.
///
/// Timestamps are written as plain dates when every point falls on
/// midnight. Values use the shortest representation that parses back to
/// the same `f64`.
pub fn write_combined_table(
    combined: &CombinedSeries,
    time_column: &str,
    value_column: &str,
) -> Result<Vec<u8>> {
    let date_only = combined
        .series()
        .timestamps()
        .iter()
        .all(|ts| ts.num_seconds_from_midnight() == 0 && ts.nanosecond() == 0);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([time_column, value_column, KIND_COLUMN])?;
    for (ts, value, kind) in combined.rows() {
        writer.write_record([
            format_timestamp(&ts, date_only),
            value.to_string(),
            kind.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ForecastError::CsvError(e.to_string()))
}

/// Parse a table written by [`write_combined_table`].
///
/// Historical rows must precede forecast rows.
pub fn read_combined_table(bytes: &[u8]) -> Result<CombinedSeries> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    if headers.len() != 3 || &headers[2] != KIND_COLUMN {
        return Err(ForecastError::MalformedInput(format!(
            "Expected three columns ending in '{}', found {:?}",
            KIND_COLUMN,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut historical_len = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let ts = TimeFormat::detect(&record[0])
            .and_then(|format| format.parse(&record[0]))
            .ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "Row {}: unparseable timestamp '{}'",
                    row + 1,
                    &record[0]
                ))
            })?;
        let value: f64 = record[1].parse().map_err(|_| {
            ForecastError::MalformedInput(format!(
                "Row {}: non-numeric value '{}'",
                row + 1,
                &record[1]
            ))
        })?;
        let kind: PointKind = record[2].parse()?;

        match kind {
            PointKind::Historical if historical_len != timestamps.len() => {
                return Err(ForecastError::MalformedInput(format!(
                    "Row {}: historical row after forecast rows",
                    row + 1
                )));
            }
            PointKind::Historical => historical_len += 1,
            PointKind::Forecast => {}
        }
        timestamps.push(ts);
        values.push(value);
    }

    let series = TimeSeries::new(timestamps, values)?;
    CombinedSeries::from_parts(series, historical_len)
}
