//! Forecasting models for time series data

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

/// Point forecasts on the original scale, with their standard errors
#[derive(Debug, Clone, PartialEq)]
pub struct ModelForecast {
    /// Forecasted values, one per step ahead
    pub values: Vec<f64>,
    /// Standard error of each forecasted value
    pub std_errors: Vec<f64>,
}

impl ModelForecast {
    /// Two-sided prediction intervals at `confidence_level`
    pub fn intervals(&self, confidence_level: f64) -> Result<Vec<(f64, f64)>> {
        if confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(ForecastError::ValidationError(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + confidence_level / 2.0);

        Ok(self
            .values
            .iter()
            .zip(&self.std_errors)
            .map(|(v, se)| (v - z * se, v + z * se))
            .collect())
    }
}

/// Result of forecasting a series: timestamped future values
#[derive(Debug, Clone)]
pub struct ForecastResult {
    series: TimeSeries,
    intervals: Option<Vec<(f64, f64)>>,
    model: String,
    frequency: Frequency,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(
        series: TimeSeries,
        intervals: Option<Vec<(f64, f64)>>,
        model: String,
        frequency: Frequency,
    ) -> Result<Self> {
        if let Some(intervals) = &intervals {
            if intervals.len() != series.len() {
                return Err(ForecastError::InvariantViolation(format!(
                    "Values length ({}) doesn't match intervals length ({})",
                    series.len(),
                    intervals.len()
                )));
            }
        }

        Ok(Self {
            series,
            intervals,
            model,
            frequency,
        })
    }

    /// The forecasted series
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        self.series.values()
    }

    /// Number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.series.len()
    }

    /// Prediction intervals, if computed
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Label of the fitted model, e.g. `ARIMA(1,1,0)+c`
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Frequency the forecast timestamps follow
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send {
    /// Generate forecast for future periods
    fn forecast(&self, horizon: usize) -> Result<ModelForecast>;

    /// In-sample one-step residuals on the modelled scale
    fn residuals(&self) -> &[f64];

    /// Name of the model
    fn name(&self) -> String;
}

/// Forecast model that can be trained on a series of values
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on the values of a series
    fn train(&self, data: &[f64]) -> Result<Self::Trained>;

    /// Minimum number of observations `train` accepts
    fn min_observations(&self) -> usize;

    /// Get the name of the model
    fn name(&self) -> String;
}

pub mod arima;
