//! ARIMA models for time series forecasting
//!
//! Estimation follows the Hannan-Rissanen procedure:
//!
//! 1. difference the series `d` times, then optionally once at the
//!    seasonal period, and subtract the mean when a constant is included;
//! 2. when `q > 0`, fit a long autoregression by least squares and keep its
//!    residuals as estimates of the innovations;
//! 3. regress the differenced series on its own lags and the lagged
//!    innovation estimates to obtain the AR and MA coefficients.
//!
//! Every step is closed-form least squares, so fitting is deterministic and
//! runs in bounded time. Fitted models must be stationary and invertible.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ModelForecast, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use series_math::differencing::{difference, integrate};
use series_math::polynomial::{integrated_ar, is_invertible, is_stationary, psi_weights};
use series_math::regression::least_squares;
use series_math::stats;
use tracing::debug;

/// Largest AR or MA order accepted
pub const MAX_ARMA_ORDER: usize = 10;
/// Largest differencing order accepted
pub const MAX_DIFFERENCING: usize = 2;
/// Cap on the long autoregression used to estimate innovations
const MAX_LONG_AR_ORDER: usize = 8;

/// Non-seasonal ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// One seasonal difference `(1 - B^period)` applied after regular differencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalDifferencing {
    pub period: usize,
}

/// How the `(p, q)` part of the order is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OrderSelection {
    /// Use `ArimaConfig::order` as given
    Fixed,
    /// Fit every `p <= max_p`, `q <= max_q` with the configured `d` and keep
    /// the lowest AIC; ties keep the earliest `(p, q)`
    Aic { max_p: usize, max_q: usize },
}

/// Explicit ARIMA configuration.
///
/// The default is `ARIMA(1,1,0)` with a constant, which on a differenced
/// series acts as a drift term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    pub order: ArimaOrder,
    pub include_constant: bool,
    pub seasonal: Option<SeasonalDifferencing>,
    pub selection: OrderSelection,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::new(1, 1, 0),
            include_constant: true,
            seasonal: None,
            selection: OrderSelection::Fixed,
        }
    }
}

impl ArimaConfig {
    /// Check order bounds
    pub fn validate(&self) -> Result<()> {
        let ArimaOrder { p, d, q } = self.order;
        if p > MAX_ARMA_ORDER || q > MAX_ARMA_ORDER {
            return Err(ForecastError::ValidationError(format!(
                "AR and MA orders must be <= {}, got p={} q={}",
                MAX_ARMA_ORDER, p, q
            )));
        }
        if d > MAX_DIFFERENCING {
            return Err(ForecastError::ValidationError(format!(
                "Differencing order must be <= {}, got {}",
                MAX_DIFFERENCING, d
            )));
        }
        if let Some(seasonal) = self.seasonal {
            if seasonal.period < 2 {
                return Err(ForecastError::ValidationError(format!(
                    "Seasonal period must be at least 2, got {}",
                    seasonal.period
                )));
            }
        }
        if let OrderSelection::Aic { max_p, max_q } = self.selection {
            if max_p > MAX_ARMA_ORDER || max_q > MAX_ARMA_ORDER {
                return Err(ForecastError::ValidationError(format!(
                    "Order search bounds must be <= {}",
                    MAX_ARMA_ORDER
                )));
            }
        }
        Ok(())
    }

    fn seasonal_period(&self) -> Option<usize> {
        self.seasonal.map(|s| s.period)
    }
}

/// Observations needed to estimate `order` without running out of rows
fn required_observations(order: ArimaOrder, seasonal: Option<usize>) -> usize {
    let ArimaOrder { p, d, q } = order;
    let k = p + q;
    let long_ar = if q > 0 { k } else { 0 };
    let start = p.max(long_ar + q);
    d + seasonal.unwrap_or(0) + (start + k + 2).max(3)
}

fn model_label(order: ArimaOrder, seasonal: Option<usize>, include_constant: bool) -> String {
    let mut label = format!("ARIMA({},{},{})", order.p, order.d, order.q);
    if let Some(period) = seasonal {
        label.push_str(&format!("(0,1,0)[{}]", period));
    }
    if include_constant {
        label.push_str("+c");
    }
    label
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct Arima {
    config: ArimaConfig,
}

impl Arima {
    /// Create a new ARIMA model from a validated configuration
    pub fn new(config: ArimaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Fixed-order model with a constant term
    pub fn with_order(p: usize, d: usize, q: usize) -> Result<Self> {
        Self::new(ArimaConfig {
            order: ArimaOrder::new(p, d, q),
            ..ArimaConfig::default()
        })
    }

    /// The configuration this model fits with
    pub fn config(&self) -> &ArimaConfig {
        &self.config
    }

    fn fit_order(&self, order: ArimaOrder, data: &[f64]) -> Result<TrainedArima> {
        let ArimaOrder { p, d, q } = order;
        let seasonal = self.config.seasonal_period();
        let include_constant = self.config.include_constant;

        let required = required_observations(order, seasonal);
        if data.len() < required {
            return Err(ForecastError::MalformedInput(format!(
                "{} needs at least {} observations, got {}",
                model_label(order, seasonal, include_constant),
                required,
                data.len()
            )));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::MalformedInput(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        // levels[k] is the series after k regular differences
        let mut levels = Vec::with_capacity(d);
        let mut current = data.to_vec();
        for _ in 0..d {
            let next = difference(&current, 1)?;
            levels.push(current);
            current = next;
        }
        let regular = current;
        let differenced = match seasonal {
            Some(period) => difference(&regular, period)?,
            None => regular.clone(),
        };

        let scale = data.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let tolerance = 1e-10 * scale;
        if stats::is_constant(data, tolerance) {
            return Err(ForecastError::ForecastingError(format!(
                "Series is constant; {} is degenerate",
                model_label(order, seasonal, include_constant)
            )));
        }

        // A differenced series with no variation is pure drift: the
        // differenced value repeats and the ARMA terms vanish
        let drift = stats::is_constant(&differenced, tolerance);
        let mean = if include_constant || drift {
            stats::mean(&differenced)?
        } else {
            0.0
        };
        let centered: Vec<f64> = if drift {
            vec![0.0; differenced.len()]
        } else {
            differenced.iter().map(|w| w - mean).collect()
        };
        let n = centered.len();
        let k = p + q;

        let (ar, ma) = if drift {
            (vec![0.0; p], vec![0.0; q])
        } else if k == 0 {
            (Vec::new(), Vec::new())
        } else {
            let (innovations, long_ar) = if q > 0 {
                let mut m = k.max((n / 4).min(MAX_LONG_AR_ORDER));
                if n < p.max(m + q) + k + 2 {
                    m = k;
                }
                (Self::long_ar_innovations(&centered, m)?, m)
            } else {
                (vec![0.0; n], 0)
            };

            let start = p.max(if q > 0 { long_ar + q } else { 0 });
            let mut design = Vec::with_capacity(n - start);
            let mut target = Vec::with_capacity(n - start);
            for t in start..n {
                let mut row = Vec::with_capacity(k);
                row.extend((1..=p).map(|i| centered[t - i]));
                row.extend((1..=q).map(|j| innovations[t - j]));
                design.push(row);
                target.push(centered[t]);
            }

            let fit = least_squares(&design, &target)?;
            let (ar, ma) = fit.coefficients.split_at(p);
            (ar.to_vec(), ma.to_vec())
        };

        if !is_stationary(&ar) {
            return Err(ForecastError::ForecastingError(format!(
                "Fitted AR coefficients {:?} are not stationary",
                ar
            )));
        }
        if !is_invertible(&ma) {
            return Err(ForecastError::ForecastingError(format!(
                "Fitted MA coefficients {:?} are not invertible",
                ma
            )));
        }

        let residuals = conditional_residuals(&centered, &ar, &ma);
        let effective = n - p;
        let rss: f64 = residuals[p..].iter().map(|e| e * e).sum();
        let n_params = k + usize::from(include_constant);
        let sigma2 = rss / effective.saturating_sub(n_params).max(1) as f64;
        let aic = if drift {
            f64::NEG_INFINITY
        } else {
            effective as f64 * (rss / effective as f64).ln() + 2.0 * (n_params + 1) as f64
        };

        let trained = TrainedArima {
            order,
            seasonal,
            include_constant,
            ar,
            ma,
            mean,
            levels,
            regular,
            centered,
            residuals,
            sigma2,
            aic,
        };
        debug!(
            model = %trained.name(),
            ar = ?trained.ar,
            ma = ?trained.ma,
            mean = trained.mean,
            sigma2 = trained.sigma2,
            aic = trained.aic,
            "fitted ARIMA"
        );
        Ok(trained)
    }

    /// Residuals of a least squares AR(`m`) fit, zero for the first `m` points
    fn long_ar_innovations(centered: &[f64], m: usize) -> Result<Vec<f64>> {
        let n = centered.len();
        let design: Vec<Vec<f64>> = (m..n)
            .map(|t| (1..=m).map(|i| centered[t - i]).collect())
            .collect();
        let fit = least_squares(&design, &centered[m..])?;

        let mut innovations = vec![0.0; m];
        innovations.extend(fit.residuals);
        Ok(innovations)
    }
}

/// One-step residuals of an ARMA recursion, conditioned on zero
/// innovations before the first `p` observations
fn conditional_residuals(centered: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; centered.len()];
    for t in p..centered.len() {
        let ar_part: f64 = ar.iter().enumerate().map(|(i, phi)| phi * centered[t - 1 - i]).sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * residuals[t - 1 - j])
            .sum();
        residuals[t] = centered[t] - ar_part - ma_part;
    }
    residuals
}

impl ForecastModel for Arima {
    type Trained = TrainedArima;

    fn train(&self, data: &[f64]) -> Result<TrainedArima> {
        match self.config.selection {
            OrderSelection::Fixed => self.fit_order(self.config.order, data),
            OrderSelection::Aic { max_p, max_q } => {
                let d = self.config.order.d;
                let mut best: Option<TrainedArima> = None;
                let mut last_error = None;

                for p in 0..=max_p {
                    for q in 0..=max_q {
                        match self.fit_order(ArimaOrder::new(p, d, q), data) {
                            Ok(candidate) => {
                                let better = best
                                    .as_ref()
                                    .map(|b| candidate.aic < b.aic)
                                    .unwrap_or(true);
                                if better {
                                    best = Some(candidate);
                                }
                            }
                            Err(err) => {
                                debug!(p, d, q, error = %err, "skipping candidate order");
                                last_error = Some(err);
                            }
                        }
                    }
                }

                best.ok_or_else(|| {
                    last_error.unwrap_or_else(|| {
                        ForecastError::ForecastingError(
                            "No candidate ARIMA order could be fitted".to_string(),
                        )
                    })
                })
            }
        }
    }

    fn min_observations(&self) -> usize {
        let order = match self.config.selection {
            OrderSelection::Fixed => self.config.order,
            OrderSelection::Aic { .. } => ArimaOrder::new(0, self.config.order.d, 0),
        };
        required_observations(order, self.config.seasonal_period())
    }

    fn name(&self) -> String {
        match self.config.selection {
            OrderSelection::Fixed => model_label(
                self.config.order,
                self.config.seasonal_period(),
                self.config.include_constant,
            ),
            OrderSelection::Aic { max_p, max_q } => {
                format!("ARIMA(auto p<={},d={},q<={})", max_p, self.config.order.d, max_q)
            }
        }
    }
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArima {
    order: ArimaOrder,
    seasonal: Option<usize>,
    include_constant: bool,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    /// Series after 0..d regular differences, for integrating forecasts back
    levels: Vec<Vec<f64>>,
    /// Series after all regular differences, before seasonal differencing
    regular: Vec<f64>,
    /// Fully differenced series minus its mean
    centered: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    aic: f64,
}

impl TrainedArima {
    /// The fitted order
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Get AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Get MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Mean of the differenced series (zero without a constant)
    pub fn constant(&self) -> f64 {
        self.mean
    }

    /// Innovation variance estimate
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Akaike information criterion of the conditional fit
    pub fn aic(&self) -> f64 {
        self.aic
    }

    fn forecast_differenced(&self, horizon: usize) -> Vec<f64> {
        let n = self.centered.len();
        let mut extended = self.centered.clone();
        let mut shocks = self.residuals.clone();

        for t in n..n + horizon {
            let ar_part: f64 = self
                .ar
                .iter()
                .enumerate()
                .filter(|(i, _)| t > *i)
                .map(|(i, phi)| phi * extended[t - 1 - i])
                .sum();
            let ma_part: f64 = self
                .ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, theta)| theta * shocks[t - 1 - j])
                .sum();
            extended.push(ar_part + ma_part);
            shocks.push(0.0);
        }

        extended[n..].iter().map(|w| w + self.mean).collect()
    }
}

impl TrainedForecastModel for TrainedArima {
    fn forecast(&self, horizon: usize) -> Result<ModelForecast> {
        if horizon == 0 {
            return Err(ForecastError::invalid_parameter(
                "horizon",
                "Forecast horizon must be at least 1",
            ));
        }

        let mut values = self.forecast_differenced(horizon);
        if let Some(period) = self.seasonal {
            values = integrate(&self.regular, &values, period)?;
        }
        for level in self.levels.iter().rev() {
            values = integrate(level, &values, 1)?;
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(format!(
                "{} produced non-finite forecasts",
                self.name()
            )));
        }

        let full_ar = integrated_ar(&self.ar, self.order.d, self.seasonal);
        let psi = psi_weights(&full_ar, &self.ma, horizon);
        let mut cumulative = 0.0;
        let std_errors = psi
            .iter()
            .map(|w| {
                cumulative += w * w;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        Ok(ModelForecast { values, std_errors })
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn name(&self) -> String {
        model_label(self.order, self.seasonal, self.include_constant)
    }
}
