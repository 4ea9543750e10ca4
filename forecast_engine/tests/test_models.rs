use approx::assert_relative_eq;
use forecast_engine::models::arima::{Arima, ArimaConfig, ArimaOrder, OrderSelection};
use forecast_engine::models::{ForecastModel, TrainedForecastModel};
use forecast_engine::ForecastError;
use rstest::rstest;

fn shocks(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        })
        .collect()
}

fn ar1(n: usize, phi: f64) -> Vec<f64> {
    let e = shocks(n, 42);
    let mut y = vec![0.0; n];
    for t in 1..n {
        y[t] = phi * y[t - 1] + e[t];
    }
    y.iter().map(|v| v + 50.0).collect()
}

#[rstest]
#[case(1, 0, 0)]
#[case(2, 0, 0)]
#[case(0, 0, 1)]
#[case(1, 0, 1)]
#[case(0, 1, 0)]
#[case(1, 1, 0)]
fn test_orders_forecast_finite_values(#[case] p: usize, #[case] d: usize, #[case] q: usize) {
    let data = ar1(300, 0.5);
    let model = Arima::with_order(p, d, q).unwrap();
    let trained = model.train(&data).unwrap();
    let forecast = trained.forecast(8).unwrap();

    assert_eq!(forecast.values.len(), 8);
    assert_eq!(forecast.std_errors.len(), 8);
    assert!(forecast.values.iter().all(|v| v.is_finite()));
    assert!(forecast.std_errors.windows(2).all(|w| w[1] >= w[0] - 1e-12));
    assert_eq!(trained.residuals().len(), data.len() - d);
}

#[test]
fn test_stationary_forecast_reverts_to_mean() {
    let data = ar1(500, 0.5);
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let trained = Arima::with_order(1, 0, 0).unwrap().train(&data).unwrap();
    let forecast = trained.forecast(60).unwrap();

    assert_relative_eq!(*forecast.values.last().unwrap(), mean, epsilon = 1e-6);
}

#[test]
fn test_aic_selection_reports_chosen_order() {
    let data = ar1(400, 0.7);
    let model = Arima::new(ArimaConfig {
        order: ArimaOrder::new(0, 0, 0),
        selection: OrderSelection::Aic { max_p: 2, max_q: 1 },
        ..ArimaConfig::default()
    })
    .unwrap();

    let trained = model.train(&data).unwrap();
    let order = trained.order();
    assert!(order.p >= 1, "AR structure should be detected, got {:?}", order);
    assert!(order.p <= 2 && order.q <= 1);
    assert!(trained.name().starts_with("ARIMA("));
}

#[test]
fn test_invalid_differencing_order() {
    let result = Arima::with_order(1, 3, 0);
    assert!(matches!(result, Err(ForecastError::ValidationError(_))));
}

#[test]
fn test_intervals_at_confidence_level() {
    let data = ar1(200, 0.3);
    let trained = Arima::with_order(1, 0, 0).unwrap().train(&data).unwrap();
    let forecast = trained.forecast(3).unwrap();

    let narrow = forecast.intervals(0.5).unwrap();
    let wide = forecast.intervals(0.99).unwrap();
    for (n, w) in narrow.iter().zip(&wide) {
        assert!(w.0 < n.0 && n.1 < w.1);
    }
    assert!(forecast.intervals(1.5).is_err());
}
