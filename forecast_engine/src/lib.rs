//! # Forecast Engine
//!
//! Univariate time series forecasting from tabular data.
//!
//! ## Features
//!
//! - CSV loading into a validated, time-ordered series
//! - Frequency inference for fixed steps and calendar months
//! - ARIMA fitting by conditional least squares, with optional seasonal
//!   differencing and AIC order selection
//! - Forecasts with prediction intervals
//! - Charting (SVG) and export of the combined history and forecast
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_engine::pipeline::{forecast_table, EngineConfig, ForecastRequest};
//!
//! let csv = std::fs::read("sales.csv")?;
//! let request = ForecastRequest::new("month", "sales", 12);
//! let report = forecast_table(&csv, &request, &EngineConfig::default())?;
//!
//! println!("{} forecast {} periods", report.outcome.forecast.model(), report.combined.forecast_len());
//! std::fs::write("forecast.svg", &report.chart.bytes)?;
//! std::fs::write("combined.csv", &report.table)?;
//! # Ok::<(), forecast_engine::ForecastError>(())
//! ```

pub mod combine;
pub mod data;
pub mod error;
pub mod export;
pub mod frequency;
pub mod models;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use crate::combine::{combine, CombinedSeries, PointKind};
pub use crate::data::{DataLoader, TimeSeries};
pub use crate::error::ForecastError;
pub use crate::export::{read_combined_table, write_combined_table};
pub use crate::frequency::Frequency;
pub use crate::models::arima::{ArimaConfig, ArimaOrder, OrderSelection, SeasonalDifferencing};
pub use crate::models::ForecastResult;
pub use crate::pipeline::{
    fit_and_forecast, forecast_table, EngineConfig, ForecastOutcome, ForecastReport,
    ForecastRequest,
};
pub use crate::render::{render, ChartSettings, RenderedArtifact};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
