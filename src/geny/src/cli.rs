//! CLI commands for geny-scraper.
//!
//! Each subcommand resolves its paths and URL lists (arguments first, then
//! configuration) and hands off to the pipeline or a spreadsheet task.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::dates;
use crate::mapping;
use crate::pipeline::{self, ArriveesJob, PartantsJob};
use crate::scraper::HttpFetcher;

#[derive(Parser)]
#[command(name = "geny-scraper")]
#[command(version, about = "Scrape geny.com entrants and results into CSV/Excel tables", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./config.toml, .yaml or .json when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape entrants ("partants") pages into the entrant dataset
    Partants {
        /// Entrants page URLs (default: urls.partants from the configuration)
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Track statistics spreadsheet
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Also scrape the other races of each URL's meeting
        #[arg(long)]
        expand: bool,

        /// Also write a formatted xlsx copy
        #[arg(long, value_name = "FILE")]
        xlsx: Option<PathBuf>,
    },

    /// Merge results ("arrivées") pages into the entrant dataset
    Arrivees {
        /// Results page URLs (default: urls.arrivees from the configuration)
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Entrant dataset to update
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also scrape the other races of each URL's meeting
        #[arg(long)]
        expand: bool,

        /// Also write a formatted xlsx copy
        #[arg(long, value_name = "FILE")]
        xlsx: Option<PathBuf>,
    },

    /// Map I-Place codes to places and runner counts
    Mapping {
        /// Sheet with I-Place-1..4 columns
        #[arg(long)]
        depart: PathBuf,

        /// Reference list with I-Place/Place/NbrPartants column groups
        #[arg(long)]
        reference: PathBuf,

        /// Output xlsx path
        #[arg(short, long, default_value = "resultat.xlsx")]
        output: PathBuf,
    },

    /// Compute day-of-year and day gaps for a sheet of dates
    Dates {
        /// Sheet with Date-du-Jour and Date-1..4 columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path (default: <input stem>_resultat.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the entrants scrape.
pub async fn run_partants(
    config: &AppConfig,
    urls: Vec<String>,
    output: Option<PathBuf>,
    reference: Option<PathBuf>,
    expand: bool,
    xlsx: Option<PathBuf>,
) -> anyhow::Result<()> {
    let job = PartantsJob {
        urls: if urls.is_empty() { config.urls.partants.clone() } else { urls },
        output: output.unwrap_or_else(|| PathBuf::from(&config.files.partants_output)),
        reference: reference.unwrap_or_else(|| PathBuf::from(&config.files.reference)),
        expand: expand || config.extraction.expand_meetings,
        xlsx,
    };

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let written = pipeline::run_partants(&fetcher, config, &job).await?;

    println!("{} entrant records written to {}", written, job.output.display());
    Ok(())
}

/// Run the results merge.
pub async fn run_arrivees(
    config: &AppConfig,
    urls: Vec<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    expand: bool,
    xlsx: Option<PathBuf>,
) -> anyhow::Result<()> {
    let job = ArriveesJob {
        urls: if urls.is_empty() { config.urls.arrivees.clone() } else { urls },
        input: input.unwrap_or_else(|| PathBuf::from(&config.files.partants_output)),
        output: output.unwrap_or_else(|| PathBuf::from(&config.files.arrivees_output)),
        expand: expand || config.extraction.expand_meetings,
        xlsx,
    };

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let written = pipeline::run_arrivees(&fetcher, config, &job).await?;

    println!("{} records written to {}", written, job.output.display());
    Ok(())
}

/// Run the place mapping task.
pub fn run_mapping(depart: PathBuf, reference: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let rows = mapping::run_mapping(&depart, &reference, &output)?;
    println!("{} rows mapped into {}", rows, output.display());
    Ok(())
}

/// Run the date calculation task.
pub fn run_dates(input: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| dates::default_output(&input));
    let rows = dates::run_dates(&input, &output)?;
    println!("{} rows written to {}", rows, output.display());
    Ok(())
}
