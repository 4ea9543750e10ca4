//! End-to-end forecasting: table in, forecast, chart and combined table out

use crate::combine::{combine, CombinedSeries};
use crate::data::{DataLoader, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::export::write_combined_table;
use crate::frequency::Frequency;
use crate::models::arima::{Arima, ArimaConfig};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::render::{render, ChartSettings, RenderedArtifact};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default number of observations required before fitting
pub const DEFAULT_MIN_OBSERVATIONS: usize = 10;

/// Engine settings shared by every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound on series length; the model may require more
    pub min_observations: usize,
    pub arima: ArimaConfig,
    /// Coverage of the prediction intervals, in `(0, 1)`
    pub confidence_level: f64,
    pub chart: ChartSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            arima: ArimaConfig::default(),
            confidence_level: 0.95,
            chart: ChartSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::ValidationError(format!(
                "Confidence level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ForecastError::ValidationError(
                "Chart dimensions must be positive".to_string(),
            ));
        }
        self.arima.validate()
    }
}

/// Which columns to read and how far to forecast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub time_column: String,
    pub value_column: String,
    pub horizon: usize,
}

impl ForecastRequest {
    pub fn new(time_column: &str, value_column: &str, horizon: usize) -> Self {
        Self {
            time_column: time_column.to_string(),
            value_column: value_column.to_string(),
            horizon,
        }
    }
}

/// The parsed history and the forecast continuing it
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub historical: TimeSeries,
    pub forecast: ForecastResult,
}

impl ForecastOutcome {
    /// History followed by the forecast
    pub fn combined(&self) -> Result<CombinedSeries> {
        combine(&self.historical, self.forecast.series())
    }
}

/// Everything a caller needs to return from one forecast request
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub outcome: ForecastOutcome,
    pub combined: CombinedSeries,
    pub chart: RenderedArtifact,
    /// CSV bytes written by [`write_combined_table`]
    pub table: Vec<u8>,
}

/// Parse a table, fit the configured ARIMA model and forecast `horizon`
/// periods past the last observation.
pub fn fit_and_forecast(
    table: &DataFrame,
    time_column: &str,
    value_column: &str,
    horizon: usize,
    config: &EngineConfig,
) -> Result<ForecastOutcome> {
    check_horizon(horizon)?;
    let historical = TimeSeries::from_table(table, time_column, value_column)?;
    forecast_series(historical, horizon, config)
}

/// Forecast an already constructed series
pub fn forecast_series(
    historical: TimeSeries,
    horizon: usize,
    config: &EngineConfig,
) -> Result<ForecastOutcome> {
    check_horizon(horizon)?;
    config.validate()?;

    let model = Arima::new(config.arima.clone())?;
    let required = config.min_observations.max(model.min_observations()).max(2);
    if historical.len() < required {
        return Err(ForecastError::MalformedInput(format!(
            "{} needs at least {} observations, got {}",
            model.name(),
            required,
            historical.len()
        )));
    }

    let frequency = Frequency::infer(historical.timestamps())?;
    let trained = model.train(historical.values())?;
    debug!(model = %trained.name(), %frequency, observations = historical.len(), "model fitted");

    let prediction = trained.forecast(horizon)?;
    let intervals = prediction.intervals(config.confidence_level)?;

    let (last, _) = historical.last().ok_or_else(|| {
        ForecastError::MalformedInput("Cannot forecast an empty series".to_string())
    })?;
    let timestamps = frequency.future_timestamps(last, horizon)?;
    let series = TimeSeries::new(timestamps, prediction.values)
        .map_err(|e| ForecastError::InvariantViolation(e.to_string()))?;

    let forecast = ForecastResult::new(series, Some(intervals), trained.name(), frequency)?;
    info!(
        model = forecast.model(),
        %frequency,
        horizon,
        "forecast produced"
    );

    Ok(ForecastOutcome {
        historical,
        forecast,
    })
}

/// Full pipeline over raw CSV bytes: load, fit, combine, render and export
pub fn forecast_table(
    bytes: &[u8],
    request: &ForecastRequest,
    config: &EngineConfig,
) -> Result<ForecastReport> {
    check_horizon(request.horizon)?;
    let table = DataLoader::read_csv(bytes)?;
    let outcome = fit_and_forecast(
        &table,
        &request.time_column,
        &request.value_column,
        request.horizon,
        config,
    )?;

    let combined = outcome.combined()?;
    let settings = config
        .chart
        .clone()
        .with_labels(&request.time_column, &request.value_column);
    let chart = render(&outcome.historical, outcome.forecast.series(), &settings)?;
    let table = write_combined_table(&combined, &request.time_column, &request.value_column)?;

    Ok(ForecastReport {
        outcome,
        combined,
        chart,
        table,
    })
}

fn check_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::invalid_parameter(
            "horizon",
            "Forecast horizon must be at least 1",
        ));
    }
    Ok(())
}
