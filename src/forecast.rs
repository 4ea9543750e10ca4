//! Forecast API: fetch a table, forecast it and keep the artifacts

use crate::config::ForecastSettings;
use crate::error::{Result, ServiceError};
use crate::fetch::BlobFetcher;
use crate::store::{validate_session_id, ArtifactRecord, ArtifactStore};
use chrono::Utc;
use forecast_engine::pipeline::{forecast_table, ForecastReport};
use forecast_engine::{EngineConfig, ForecastError, ForecastResult, RenderedArtifact};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// A caller's forecast request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub source_url: String,
    pub time_column: String,
    pub value_column: String,
    /// Periods to forecast; the configured default when absent
    #[serde(default)]
    pub horizon: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ForecastRequest {
    pub fn new(source_url: &str, time_column: &str, value_column: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            time_column: time_column.to_string(),
            value_column: value_column.to_string(),
            horizon: None,
            session_id: None,
        }
    }

    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}

/// Everything produced for one request
#[derive(Debug, Clone)]
pub struct ForecastArtifacts {
    pub request_id: Uuid,
    pub session_id: Option<String>,
    pub chart: RenderedArtifact,
    /// CSV of history followed by forecast, with a `kind` column
    pub combined_table: Vec<u8>,
    pub result: ForecastResult,
}

struct ValidatedRequest {
    url: Url,
    engine: forecast_engine::ForecastRequest,
}

/// Runs forecasts and serves their stored artifacts
pub struct ForecastService {
    fetcher: Arc<dyn BlobFetcher>,
    store: Arc<dyn ArtifactStore>,
    engine: EngineConfig,
    default_horizon: usize,
    fit_timeout: Duration,
}

impl ForecastService {
    pub fn new(
        fetcher: Arc<dyn BlobFetcher>,
        store: Arc<dyn ArtifactStore>,
        settings: &ForecastSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            engine: settings.engine.clone(),
            default_horizon: settings.default_horizon,
            fit_timeout: settings.fit_timeout(),
        }
    }

    /// Bound on load, fit and render time per request
    pub fn with_fit_timeout(mut self, fit_timeout: Duration) -> Self {
        self.fit_timeout = fit_timeout;
        self
    }

    fn validate(&self, request: &ForecastRequest) -> Result<ValidatedRequest> {
        let horizon = request.horizon.unwrap_or(self.default_horizon as i64);
        if horizon < 1 {
            return Err(ServiceError::validation(
                "horizon",
                format!("must be a positive integer, got {}", horizon),
            ));
        }
        for (field, value) in [
            ("time_column", &request.time_column),
            ("value_column", &request.value_column),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::validation(field, "must not be empty"));
            }
        }
        if request.time_column == request.value_column {
            return Err(ServiceError::validation(
                "value_column",
                "must differ from time_column",
            ));
        }
        if let Some(session_id) = &request.session_id {
            validate_session_id(session_id)?;
        }

        let url = Url::parse(request.source_url.trim()).map_err(|e| {
            ServiceError::validation(
                "source_url",
                format!("'{}' is not a URL: {}", request.source_url, e),
            )
        })?;

        let horizon = usize::try_from(horizon)
            .map_err(|_| ServiceError::validation("horizon", "is too large"))?;
        Ok(ValidatedRequest {
            url,
            engine: forecast_engine::ForecastRequest::new(
                &request.time_column,
                &request.value_column,
                horizon,
            ),
        })
    }

    fn engine_error(err: ForecastError, request: &forecast_engine::ForecastRequest) -> ServiceError {
        match err {
            ForecastError::MissingColumn(column) => {
                let field = if column == request.time_column {
                    "time_column"
                } else {
                    "value_column"
                };
                ServiceError::validation(field, format!("column '{}' not found in table", column))
            }
            other => other.into(),
        }
    }

    async fn run_pipeline(
        &self,
        bytes: Vec<u8>,
        request: forecast_engine::ForecastRequest,
    ) -> Result<ForecastReport> {
        let config = self.engine.clone();
        let engine_request = request.clone();
        let task =
            tokio::task::spawn_blocking(move || forecast_table(&bytes, &engine_request, &config));

        match tokio::time::timeout(self.fit_timeout, task).await {
            Err(_) => Err(ServiceError::Timeout(format!(
                "Forecast did not finish within {:?}",
                self.fit_timeout
            ))),
            Ok(Err(join_error)) => Err(ServiceError::Internal(format!(
                "Forecast worker failed: {}",
                join_error
            ))),
            Ok(Ok(result)) => result.map_err(|e| Self::engine_error(e, &request)),
        }
    }

    /// Forecast the table at `request.source_url`
    pub async fn forecast(&self, request: ForecastRequest) -> Result<ForecastArtifacts> {
        let validated = self.validate(&request)?;
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            url = %validated.url,
            horizon = validated.engine.horizon,
            "forecast requested"
        );

        let blob = self.fetcher.fetch(&validated.url).await?;
        let report = match self.run_pipeline(blob.bytes, validated.engine).await {
            Ok(report) => report,
            Err(err) => {
                warn!(%request_id, error = %err, "forecast failed");
                return Err(err);
            }
        };

        let record = ArtifactRecord {
            request_id,
            session_id: request.session_id.clone(),
            created_at: Utc::now(),
            chart_media_type: report.chart.media_type.to_string(),
            chart: report.chart.bytes.clone(),
            combined_table: report.table.clone(),
        };
        self.store.put(record).await?;

        info!(
            %request_id,
            model = report.outcome.forecast.model(),
            points = report.combined.len(),
            "forecast stored"
        );
        Ok(ForecastArtifacts {
            request_id,
            session_id: request.session_id,
            chart: report.chart,
            combined_table: report.table,
            result: report.outcome.forecast,
        })
    }

    /// Combined table of the latest forecast for `session_id`
    pub async fn latest_combined(&self, session_id: &str) -> Result<Vec<u8>> {
        validate_session_id(session_id)?;
        self.store
            .latest_for_session(session_id)
            .await?
            .map(|record| record.combined_table)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No forecast stored for session '{}'", session_id))
            })
    }

    /// Stored artifacts of a request
    pub async fn record_for(&self, request_id: &str) -> Result<ArtifactRecord> {
        let id = Uuid::parse_str(request_id.trim()).map_err(|_| {
            ServiceError::validation("request_id", format!("'{}' is not a UUID", request_id))
        })?;
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No forecast stored for request {}", id)))
    }

    /// Combined table of a request
    pub async fn combined_for(&self, request_id: &str) -> Result<Vec<u8>> {
        Ok(self.record_for(request_id).await?.combined_table)
    }
}
