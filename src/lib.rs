//! # finsight
//!
//! A finance assistant facade over a hosted generative model, plus a
//! forecasting API for CSV time series.
//!
//! ## Example
//!
//! ```no_run
//! use finsight::{App, Config, ForecastRequest};
//!
//! # async fn run() -> finsight::Result<()> {
//! let app = App::from_config(&Config::load(None)?)?;
//! let request = ForecastRequest::new("https://example.com/sales.csv", "month", "sales")
//!     .with_horizon(12)
//!     .with_session("desk-1");
//! let artifacts = app.forecasts.forecast(request).await?;
//! println!("{}", String::from_utf8_lossy(&artifacts.combined_table));
//! # Ok(())
//! # }
//! ```

pub mod advisor;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod generate;
pub mod store;
pub mod telemetry;

pub use crate::advisor::{Advisor, Analysis, Answer};
pub use crate::config::Config;
pub use crate::error::{ErrorResponse, Result, ServiceError};
pub use crate::fetch::{Blob, BlobFetcher, HttpBlobFetcher};
pub use crate::forecast::{ForecastArtifacts, ForecastRequest, ForecastService};
pub use crate::generate::{Attachment, ContentGenerator, GeminiGenerator};
pub use crate::store::{ArtifactRecord, ArtifactStore, DirArtifactStore, MemoryArtifactStore};

use std::sync::Arc;

/// The assembled services
pub struct App {
    pub advisor: Advisor,
    pub forecasts: ForecastService,
}

impl App {
    /// Wire the HTTP collaborators and a directory store from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn BlobFetcher> = Arc::new(HttpBlobFetcher::new(&config.fetch)?);
        let generator: Arc<dyn ContentGenerator> =
            Arc::new(GeminiGenerator::new(&config.generation, config.api_key())?);
        let store: Arc<dyn ArtifactStore> =
            Arc::new(DirArtifactStore::new(config.storage.cache_dir.clone()));
        Ok(Self::with_parts(config, fetcher, generator, store))
    }

    /// Assemble from explicit collaborators
    pub fn with_parts(
        config: &Config,
        fetcher: Arc<dyn BlobFetcher>,
        generator: Arc<dyn ContentGenerator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            advisor: Advisor::new(generator, fetcher.clone()),
            forecasts: ForecastService::new(fetcher, store, &config.forecast),
        }
    }
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
