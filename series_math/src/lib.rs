//! # Series Math
//!
//! Numeric building blocks for univariate time series models.
//! This crate provides differencing, least squares estimation,
//! lag-polynomial utilities and summary statistics used by the
//! forecasting engine.

use thiserror::Error;

pub mod differencing;
pub mod polynomial;
pub mod regression;
pub mod stats;

/// Errors that can occur in numeric series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
