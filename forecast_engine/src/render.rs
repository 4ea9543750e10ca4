//! Chart rendering for historical and forecast series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, TimeZone, Utc};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

/// Media type of rendered charts
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Chart layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// X axis description, normally the time column name
    pub x_label: String,
    /// Y axis description, normally the value column name
    pub y_label: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            title: "Forecast".to_string(),
            x_label: "time".to_string(),
            y_label: "value".to_string(),
        }
    }
}

impl ChartSettings {
    /// Label the axes with the given column names
    pub fn with_labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }
}

/// Encoded chart bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

fn render_error<E: std::fmt::Display>(err: E) -> ForecastError {
    ForecastError::RenderError(err.to_string())
}

fn to_points(series: &TimeSeries) -> Vec<(f64, f64)> {
    series
        .iter()
        .map(|(ts, v)| (ts.timestamp_millis() as f64 / 1000.0, v))
        .collect()
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if max - min <= f64::EPSILON * max.abs().max(1.0) {
        (min - 1.0, max + 1.0)
    } else {
        let margin = (max - min) * 0.05;
        (min - margin, max + margin)
    }
}

fn format_tick(seconds: f64) -> String {
    Utc.timestamp_opt(seconds.round() as i64, 0)
        .single()
        .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Draw historical values and the forecast as one continuous line.
///
/// The two series use different colours; a connector segment in the
/// forecast colour joins the last observation to the first forecast.
pub fn render(
    historical: &TimeSeries,
    forecast: &TimeSeries,
    settings: &ChartSettings,
) -> Result<RenderedArtifact> {
    if historical.is_empty() && forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Nothing to plot: both series are empty".to_string(),
        ));
    }

    let hist_points = to_points(historical);
    let forecast_points = to_points(forecast);
    let all = || hist_points.iter().chain(forecast_points.iter());
    let (x_min, x_max) = padded_range(all().map(|p| p.0));
    let (y_min, y_max) = padded_range(all().map(|p| p.1));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (settings.width, settings.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&settings.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_labels(8)
            .y_labels(8)
            .x_label_formatter(&|x| format_tick(*x))
            .y_label_formatter(&|y| format!("{:.2}", y))
            .x_desc(settings.x_label.as_str())
            .y_desc(settings.y_label.as_str())
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(LineSeries::new(hist_points.clone(), BLUE.stroke_width(2)))
            .map_err(render_error)?
            .label("historical")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        if let (Some(last), Some(first)) = (hist_points.last(), forecast_points.first()) {
            chart
                .draw_series(LineSeries::new(vec![*last, *first], RED.stroke_width(2)))
                .map_err(render_error)?;
        }

        chart
            .draw_series(LineSeries::new(forecast_points.clone(), RED.stroke_width(2)))
            .map_err(render_error)?
            .label("forecast")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    Ok(RenderedArtifact {
        media_type: SVG_MEDIA_TYPE,
        bytes: svg.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(start: DateTime<Utc>, values: &[f64]) -> TimeSeries {
        let ts = (0..values.len()).map(|i| start + Duration::days(i as i64)).collect();
        TimeSeries::new(ts, values.to_vec()).unwrap()
    }

    #[test]
    fn test_render_produces_svg_with_labels() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let hist = series(start, &[1.0, 2.0, 3.0]);
        let fc = series(start + Duration::days(3), &[4.0, 5.0]);
        let settings = ChartSettings::default().with_labels("month", "sales");

        let artifact = render(&hist, &fc, &settings).unwrap();
        let svg = String::from_utf8(artifact.bytes).unwrap();

        assert_eq!(artifact.media_type, SVG_MEDIA_TYPE);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("month"));
        assert!(svg.contains("sales"));
    }

    #[test]
    fn test_render_single_point() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let hist = series(start, &[7.0]);
        let empty = TimeSeries::new(Vec::new(), Vec::new()).unwrap();
        assert!(render(&hist, &empty, &ChartSettings::default()).is_ok());
        assert!(render(&empty, &empty, &ChartSettings::default()).is_err());
    }
}
