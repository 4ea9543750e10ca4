//! Time series data handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

/// An ordered univariate series of `(timestamp, value)` observations.
///
/// Timestamps are strictly increasing and every value is finite. The
/// series is immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

/// Data loader for tabular time series input
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Parse CSV bytes with a header row into a DataFrame
    pub fn read_csv(bytes: &[u8]) -> Result<DataFrame> {
        let df = CsvReader::new(Cursor::new(bytes.to_vec()))
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        if df.height() == 0 {
            return Err(ForecastError::MalformedInput(
                "Table has no data rows".to_string(),
            ));
        }

        Ok(df)
    }

    /// Load a CSV file from disk into a DataFrame
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let bytes = std::fs::read(path)?;
        Self::read_csv(&bytes)
    }

    /// Parse CSV bytes and extract the named time and value columns
    pub fn load_series(bytes: &[u8], time_column: &str, value_column: &str) -> Result<TimeSeries> {
        let df = Self::read_csv(bytes)?;
        TimeSeries::from_table(&df, time_column, value_column)
    }
}

/// Textual timestamp layouts accepted in the time column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `2024-01-31T12:00:00+02:00`
    Rfc3339,
    /// `2024-01-31T12:00:00`, optional fractional seconds
    IsoDateTime,
    /// `2024-01-31 12:00:00`, optional fractional seconds
    SpacedDateTime,
    /// `2024-01-31`
    IsoDate,
    /// `2024/01/31`
    SlashedDate,
    /// `2024-01`, read as the first of the month
    YearMonth,
    /// `2024`, read as the first of January
    Year,
}

impl TimeFormat {
    const DETECTION_ORDER: [TimeFormat; 7] = [
        TimeFormat::Rfc3339,
        TimeFormat::IsoDateTime,
        TimeFormat::SpacedDateTime,
        TimeFormat::IsoDate,
        TimeFormat::SlashedDate,
        TimeFormat::YearMonth,
        TimeFormat::Year,
    ];

    /// Find the first layout that parses `text`
    pub fn detect(text: &str) -> Option<TimeFormat> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|format| format.parse(text).is_some())
    }

    /// Parse `text` in this layout, interpreting naive times as UTC
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        let naive = match self {
            TimeFormat::Rfc3339 => {
                return DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
            TimeFormat::IsoDateTime => {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?
            }
            TimeFormat::SpacedDateTime => {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").ok()?
            }
            TimeFormat::IsoDate => midnight(NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?),
            TimeFormat::SlashedDate => {
                midnight(NaiveDate::parse_from_str(text, "%Y/%m/%d").ok()?)
            }
            TimeFormat::YearMonth => {
                if text.len() > 7 {
                    return None;
                }
                midnight(NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").ok()?)
            }
            TimeFormat::Year => {
                if text.len() != 4 || !text.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                midnight(NaiveDate::from_ymd_opt(text.parse().ok()?, 1, 1)?)
            }
        };

        Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    NaiveDateTime::new(date, NaiveTime::default())
}

impl TimeSeries {
    /// Create a series from already ordered timestamps and values
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::MalformedInput(format!(
                "Timestamps length ({}) doesn't match values length ({})",
                timestamps.len(),
                values.len()
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::MalformedInput(format!(
                "Value at position {} is not a finite number",
                pos
            )));
        }

        if let Some(pos) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ForecastError::MalformedInput(format!(
                "Timestamps are not strictly increasing at position {} ({} then {})",
                pos + 1,
                timestamps[pos],
                timestamps[pos + 1]
            )));
        }

        Ok(Self { timestamps, values })
    }

    /// Build a series from two named columns of a table.
    ///
    /// Every time value must parse in the layout detected on the first
    /// row; missing, non-numeric or non-finite values are rejected rather
    /// than interpolated. Rows are sorted by timestamp and duplicate
    /// timestamps are an error.
    pub fn from_table(df: &DataFrame, time_column: &str, value_column: &str) -> Result<Self> {
        let column_names = df.get_column_names();
        for required in [time_column, value_column] {
            if !column_names.iter().any(|name| *name == required) {
                return Err(ForecastError::MissingColumn(required.to_string()));
            }
        }

        let timestamps = Self::parse_time_column(df, time_column)?;
        let values = Self::parse_value_column(df, value_column)?;

        let mut rows: Vec<(DateTime<Utc>, f64)> = timestamps.into_iter().zip(values).collect();
        rows.sort_by_key(|(ts, _)| *ts);

        if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::MalformedInput(format!(
                "Duplicate timestamp {} in column '{}'",
                pair[0].0, time_column
            )));
        }

        let (timestamps, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Self::new(timestamps, values)
    }

    fn parse_time_column(df: &DataFrame, time_column: &str) -> Result<Vec<DateTime<Utc>>> {
        let column = df.column(time_column)?.cast(&DataType::Utf8)?;
        let text = column.utf8()?;

        let mut format: Option<TimeFormat> = None;
        let mut timestamps = Vec::with_capacity(text.len());

        for (row, cell) in text.into_iter().enumerate() {
            let cell = cell.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "Data row {}: time column '{}' is empty",
                    row + 1,
                    time_column
                ))
            })?;

            let layout = match format {
                Some(layout) => layout,
                None => {
                    let detected = TimeFormat::detect(cell).ok_or_else(|| {
                        ForecastError::MalformedInput(format!(
                            "Data row {}: '{}' in column '{}' is not a recognised timestamp",
                            row + 1,
                            cell,
                            time_column
                        ))
                    })?;
                    format = Some(detected);
                    detected
                }
            };

            let ts = layout.parse(cell).ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "Data row {}: '{}' in column '{}' does not match the {:?} layout of the first row",
                    row + 1,
                    cell,
                    time_column,
                    layout
                ))
            })?;
            timestamps.push(ts);
        }

        Ok(timestamps)
    }

    fn parse_value_column(df: &DataFrame, value_column: &str) -> Result<Vec<f64>> {
        let column = df.column(value_column)?.cast(&DataType::Float64)?;
        let numbers = column.f64()?;

        numbers
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(ForecastError::MalformedInput(format!(
                    "Data row {}: value {} in column '{}' is not finite",
                    row + 1,
                    v,
                    value_column
                ))),
                None => Err(ForecastError::MalformedInput(format!(
                    "Data row {}: value column '{}' is missing or non-numeric",
                    row + 1,
                    value_column
                ))),
            })
            .collect()
    }

    /// Get the timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over `(timestamp, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// First observation, if any
    pub fn first(&self) -> Option<(DateTime<Utc>, f64)> {
        self.iter().next()
    }

    /// Last observation, if any
    pub fn last(&self) -> Option<(DateTime<Utc>, f64)> {
        match (self.timestamps.last(), self.values.last()) {
            (Some(ts), Some(v)) => Some((*ts, *v)),
            _ => None,
        }
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.values.len()
    }
}
