//! Error types for the forecast_engine crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Invalid configuration value
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A named request parameter is out of range (e.g. a zero horizon)
    #[error("Validation error: {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    /// The table does not parse into the expected shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A named column is absent from the table header
    #[error("Malformed input: column '{0}' not found")]
    MissingColumn(String),

    /// Numeric failure while fitting or forecasting
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Internal consistency check failed; indicates a bug, not bad input
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Chart rendering failed
    #[error("Render error: {0}")]
    RenderError(String),

    /// Reading or writing a CSV table failed
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Build an `InvalidParameter` for the named field
    pub fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        ForecastError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for either flavour of malformed table input
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            ForecastError::MalformedInput(_) | ForecastError::MissingColumn(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::MalformedInput(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::ForecastingError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}
