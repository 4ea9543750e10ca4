//! # finsight
//!
//! Command-line interface for forecasting and finance questions.

use anyhow::Context;
use clap::{Parser, Subcommand};
use finsight::telemetry::init_tracing;
use finsight::{App, Config, ErrorResponse, ForecastRequest, ServiceError};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "finsight")]
#[command(about = "Finance assistant and time series forecasting", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "FINSIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast a CSV table fetched from a URL
    Forecast {
        /// Table location (http, https or file URL)
        #[arg(short, long)]
        url: String,

        /// Name of the timestamp column
        #[arg(short, long)]
        time_column: String,

        /// Name of the value column
        #[arg(short = 'v', long)]
        value_column: String,

        /// Number of periods to forecast (configured default when omitted)
        #[arg(long, allow_negative_numbers = true)]
        horizon: Option<i64>,

        /// Session to file the result under
        #[arg(short, long)]
        session: Option<String>,

        /// Where to write the chart
        #[arg(long)]
        chart_out: Option<PathBuf>,

        /// Where to write the combined table
        #[arg(long)]
        table_out: Option<PathBuf>,
    },

    /// Print a stored combined table
    Latest {
        /// Latest forecast of this session
        #[arg(short, long, conflicts_with = "request", required_unless_present = "request")]
        session: Option<String>,

        /// A specific request id
        #[arg(short, long)]
        request: Option<String>,
    },

    /// Ask a finance question
    Ask {
        question: String,
    },

    /// Summarize a document and extract its key figures
    Analyze {
        /// Document location (http, https or file URL)
        url: String,
    },
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ServiceError> {
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

async fn run(app: App, command: Commands) -> Result<(), ServiceError> {
    match command {
        Commands::Forecast {
            url,
            time_column,
            value_column,
            horizon,
            session,
            chart_out,
            table_out,
        } => {
            let request = ForecastRequest {
                source_url: url,
                time_column,
                value_column,
                horizon,
                session_id: session,
            };
            let artifacts = app.forecasts.forecast(request).await?;

            if let Some(path) = &chart_out {
                write_output(path, &artifacts.chart.bytes).await?;
            }
            match &table_out {
                Some(path) => write_output(path, &artifacts.combined_table).await?,
                None => print!("{}", String::from_utf8_lossy(&artifacts.combined_table)),
            }

            let summary = json!({
                "request_id": artifacts.request_id,
                "session_id": artifacts.session_id,
                "model": artifacts.result.model(),
                "frequency": artifacts.result.frequency().to_string(),
                "horizon": artifacts.result.horizon(),
            });
            eprintln!("{}", summary);
        }
        Commands::Latest { session, request } => {
            let table = match (session, request) {
                (_, Some(request_id)) => app.forecasts.combined_for(&request_id).await?,
                (Some(session_id), None) => app.forecasts.latest_combined(&session_id).await?,
                (None, None) => {
                    return Err(ServiceError::validation(
                        "session_id",
                        "either a session or a request id is required",
                    ))
                }
            };
            print!("{}", String::from_utf8_lossy(&table));
        }
        Commands::Ask { question } => {
            let answer = app.advisor.ask(&question).await?;
            println!("{}", json!(answer));
        }
        Commands::Analyze { url } => {
            let analysis = app.advisor.analyze_document(&url).await?;
            println!("{}", json!(analysis));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.log).context("Failed to initialise logging")?;
    let app = App::from_config(&config).context("Failed to start services")?;

    match run(app, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("{}", json!(ErrorResponse::from(&err)));
            Ok(if err.is_client_fault() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
