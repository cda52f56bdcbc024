use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use marketing_etl::app::{IngestUseCase, QueryUseCase};
use marketing_etl::config::Config;
use marketing_etl::constants::DAY_FORMAT;
use marketing_etl::infra::{FileSource, ReqwestSource};
use marketing_etl::pipeline::storage::InMemoryStorage;
use marketing_etl::server::{start_server, AppState};
use marketing_etl::{logging, observability};

#[derive(Parser)]
#[command(name = "marketing_etl")]
#[command(about = "Ads and CRM ingestion with data-quality tracking and funnel metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch both sources once and print the ingest summary
    Ingest {
        /// Keep only records on or after this day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        since: Option<NaiveDate>,
    },
    /// Build a quality report from local envelope files
    Report {
        #[arg(long)]
        ads: PathBuf,
        #[arg(long)]
        crm: PathBuf,
    },
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT).map_err(|_| format!("'{}' is not a YYYY-MM-DD date", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    logging::init_logging(&config.log_level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            if let Err(e) = observability::init() {
                warn!(error = %e, "metrics disabled");
            }
            let port = port.unwrap_or(config.port);
            let state = Arc::new(AppState::from_config(&config)?);
            info!(port, "starting marketing ETL service");
            start_server(state, port).await?;
        }
        Commands::Ingest { since } => {
            let source = Arc::new(ReqwestSource::from_config(&config)?);
            let storage = Arc::new(InMemoryStorage::new());
            let summary = IngestUseCase::new(source, storage).run(since).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Report { ads, crm } => {
            let storage = Arc::new(InMemoryStorage::new());
            IngestUseCase::new(Arc::new(FileSource::new(ads, crm)), storage.clone())
                .run(None)
                .await?;
            let report = QueryUseCase::new(storage).quality_report().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
