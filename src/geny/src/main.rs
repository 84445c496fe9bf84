//! geny-scraper
//!
//! Scrapes geny.com entrants and results pages, merges them into an entrant
//! dataset and runs the spreadsheet side tasks (place mapping, date gaps).

mod cli;
mod config;
mod dates;
mod logging;
mod mapping;
mod normalize;
mod pipeline;
mod reconcile;
mod scraper;
mod storage;
mod types;

use clap::Parser;
use tracing::{error, info};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the log file on exit
    let _guard = logging::init(&config.logging)?;
    info!("geny-scraper {} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Partants {
            urls,
            output,
            reference,
            expand,
            xlsx,
        } => cli::run_partants(&config, urls, output, reference, expand, xlsx).await,
        Commands::Arrivees {
            urls,
            input,
            output,
            expand,
            xlsx,
        } => cli::run_arrivees(&config, urls, input, output, expand, xlsx).await,
        Commands::Mapping {
            depart,
            reference,
            output,
        } => cli::run_mapping(depart, reference, output),
        Commands::Dates { input, output } => cli::run_dates(input, output),
    };

    if let Err(e) = result {
        error!("{:#}", e);
    }
    Ok(())
}
