//! Stitching historical observations and forecasts into one series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Whether a combined row was observed or forecasted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Historical,
    Forecast,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Historical => "historical",
            PointKind::Forecast => "forecast",
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "historical" => Ok(PointKind::Historical),
            "forecast" => Ok(PointKind::Forecast),
            other => Err(ForecastError::MalformedInput(format!(
                "Unknown point kind '{}'",
                other
            ))),
        }
    }
}

/// Historical observations followed by forecasts, strictly ordered in time
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSeries {
    series: TimeSeries,
    historical_len: usize,
}

impl CombinedSeries {
    /// Wrap an ordered series whose first `historical_len` points are observed
    pub fn from_parts(series: TimeSeries, historical_len: usize) -> Result<Self> {
        if historical_len > series.len() {
            return Err(ForecastError::InvariantViolation(format!(
                "Historical length {} exceeds combined length {}",
                historical_len,
                series.len()
            )));
        }
        Ok(Self {
            series,
            historical_len,
        })
    }

    /// The full ordered series
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn historical_len(&self) -> usize {
        self.historical_len
    }

    pub fn forecast_len(&self) -> usize {
        self.series.len() - self.historical_len
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Kind of the point at `index`
    pub fn kind(&self, index: usize) -> PointKind {
        if index < self.historical_len {
            PointKind::Historical
        } else {
            PointKind::Forecast
        }
    }

    /// Iterate over `(timestamp, value, kind)` rows
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, f64, PointKind)> + '_ {
        self.series
            .iter()
            .enumerate()
            .map(move |(i, (ts, v))| (ts, v, self.kind(i)))
    }

    /// Split back into historical and forecast series
    pub fn split(&self) -> Result<(TimeSeries, TimeSeries)> {
        let (hist_ts, fc_ts) = self.series.timestamps().split_at(self.historical_len);
        let (hist_v, fc_v) = self.series.values().split_at(self.historical_len);
        Ok((
            TimeSeries::new(hist_ts.to_vec(), hist_v.to_vec())?,
            TimeSeries::new(fc_ts.to_vec(), fc_v.to_vec())?,
        ))
    }
}

/// Concatenate `historical` and `forecast`.
///
/// An overlap means forecast generation produced timestamps that do not
/// continue the history, which is a bug rather than bad input.
pub fn combine(historical: &TimeSeries, forecast: &TimeSeries) -> Result<CombinedSeries> {
    if let (Some((last, _)), Some((first, _))) = (historical.last(), forecast.first()) {
        if first <= last {
            return Err(ForecastError::InvariantViolation(format!(
                "Forecast starts at {} which does not follow the last observation at {}",
                first, last
            )));
        }
    }

    let timestamps = historical
        .timestamps()
        .iter()
        .chain(forecast.timestamps())
        .copied()
        .collect();
    let values = historical
        .values()
        .iter()
        .chain(forecast.values())
        .copied()
        .collect();

    let series = TimeSeries::new(timestamps, values)
        .map_err(|e| ForecastError::InvariantViolation(e.to_string()))?;
    CombinedSeries::from_parts(series, historical.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn daily(start_day: u32, values: &[f64]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap();
        let ts = (0..values.len()).map(|i| start + Duration::days(i as i64)).collect();
        TimeSeries::new(ts, values.to_vec()).unwrap()
    }

    #[test]
    fn test_combine_lengths_and_kinds() {
        let hist = daily(1, &[1.0, 2.0, 3.0]);
        let fc = daily(4, &[4.0, 5.0]);
        let combined = combine(&hist, &fc).unwrap();

        assert_eq!(combined.len(), 5);
        assert_eq!(combined.historical_len(), 3);
        assert_eq!(combined.forecast_len(), 2);
        assert_eq!(combined.kind(2), PointKind::Historical);
        assert_eq!(combined.kind(3), PointKind::Forecast);

        let (h, f) = combined.split().unwrap();
        assert_eq!(h, hist);
        assert_eq!(f, fc);
    }

    #[test]
    fn test_combine_overlap_is_invariant_violation() {
        let hist = daily(1, &[1.0, 2.0, 3.0]);
        let fc = daily(3, &[4.0, 5.0]);
        assert!(matches!(
            combine(&hist, &fc),
            Err(ForecastError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_point_kind_parse() {
        assert_eq!("forecast".parse::<PointKind>().unwrap(), PointKind::Forecast);
        assert!("future".parse::<PointKind>().is_err());
    }
}
