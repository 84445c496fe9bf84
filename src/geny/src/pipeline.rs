//! Drivers for the two scrapes.
//!
//! `run_partants` builds the entrant dataset from entrants pages;
//! `run_arrivees` loads it back, merges every results page in URL order,
//! sorts and writes the enriched file. Fetches of a batch run concurrently,
//! everything after them is sequential.

use anyhow::{Context, Result};
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::normalize::TrackNormalizer;
use crate::reconcile::{dedupe, merge, sort_for_output};
use crate::scraper::parsers::{ArriveeParser, PartantsParser, RaceHeaderParser};
use crate::scraper::{fetch_all, FetchedPage, PageFetcher};
use crate::storage::{read_entrants, write_entrants, write_entrants_xlsx, TrackStatsTable};
use crate::types::EntrantRecord;

/// Inputs of an entrants scrape
#[derive(Debug, Clone)]
pub struct PartantsJob {
    pub urls: Vec<String>,
    pub output: PathBuf,
    pub reference: PathBuf,
    pub expand: bool,
    pub xlsx: Option<PathBuf>,
}

/// Inputs of a results scrape
#[derive(Debug, Clone)]
pub struct ArriveesJob {
    pub urls: Vec<String>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub expand: bool,
    pub xlsx: Option<PathBuf>,
}

/// Scrape entrants pages and write the entrant dataset.
///
/// Returns the number of records written.
pub async fn run_partants<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &AppConfig,
    job: &PartantsJob,
) -> Result<usize> {
    let normalizer = TrackNormalizer::new(&config.tracks.aliases);

    let pages = collect_pages(fetcher, &job.urls, job.expand, &config.fetch.base_url).await;
    if pages.is_empty() {
        warn!("No entrants URL to process");
        return Ok(0);
    }

    let reference = match TrackStatsTable::load(&job.reference, &normalizer) {
        Ok(table) => table,
        Err(e) => {
            error!("Reference file unavailable, statistics default to 0: {:#}", e);
            TrackStatsTable::default()
        }
    };

    let mut records = Vec::new();
    for page in &pages {
        if page.is_empty() {
            continue;
        }
        let document = Html::parse_document(&page.html);
        if config.extraction.discipline_filter && !RaceHeaderParser::is_trot_race(&document) {
            info!("Skipping non-trot race {}", page.url);
            continue;
        }

        match PartantsParser::parse(&document, &page.url, &config.extraction) {
            Ok(parsed) => {
                info!(
                    "{} R{}: {} entrants ({})",
                    parsed.track,
                    parsed.race_number,
                    parsed.entrants.len(),
                    parsed.url
                );
                let stats = reference.lookup(&parsed.track, &normalizer);
                records.extend(parsed.to_records(&normalizer, &stats, &config.extraction));
            }
            Err(e) => error!("Skipping {}: {:#}", page.url, e),
        }
    }

    let records = dedupe(records, &normalizer);
    if records.is_empty() {
        warn!("No entrant extracted, {} not written", job.output.display());
        return Ok(0);
    }

    write_outputs(&records, &job.output, job.xlsx.as_deref())?;
    info!("Entrants scrape done: {} records from {} pages", records.len(), pages.len());
    Ok(records.len())
}

/// Merge results pages into a previously written entrant dataset.
///
/// Returns the number of records written. Fails when the entrant file
/// cannot be read.
pub async fn run_arrivees<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &AppConfig,
    job: &ArriveesJob,
) -> Result<usize> {
    let normalizer = TrackNormalizer::new(&config.tracks.aliases);

    let mut records = read_entrants(&job.input)
        .with_context(|| format!("Cannot load entrant records from {}", job.input.display()))?;
    if records.is_empty() {
        error!("No entrant records in {}, nothing to merge", job.input.display());
        return Ok(0);
    }

    let pages = collect_pages(fetcher, &job.urls, job.expand, &config.fetch.base_url).await;
    if pages.is_empty() {
        warn!("No results URL to process");
    }

    for page in &pages {
        if page.is_empty() {
            error!("No content for {}, page skipped", page.url);
            continue;
        }
        info!("Processing {}", page.url);

        let document = Html::parse_document(&page.html);
        if config.extraction.discipline_filter && !RaceHeaderParser::is_trot_race(&document) {
            info!("Skipping non-trot race {}", page.url);
            continue;
        }

        let report = ArriveeParser::parse(&document, &page.url, &config.extraction, &config.places);
        records = merge(records, &report, &normalizer, &config.places, &config.reconcile);
    }

    sort_for_output(&mut records, &normalizer);
    write_outputs(&records, &job.output, job.xlsx.as_deref())?;
    info!("Results merge done: {} records written", records.len());
    Ok(records.len())
}

fn write_outputs(records: &[EntrantRecord], csv: &Path, xlsx: Option<&Path>) -> Result<()> {
    write_entrants(csv, records).with_context(|| format!("Cannot write {}", csv.display()))?;
    if let Some(path) = xlsx {
        write_entrants_xlsx(path, records).with_context(|| format!("Cannot write {}", path.display()))?;
    }
    Ok(())
}

/// Fetch every URL, in order. With `expand`, each seed page is followed by
/// the sibling races it links to; a URL is fetched and returned only once.
pub async fn collect_pages<F: PageFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
    expand: bool,
    base_url: &str,
) -> Vec<FetchedPage> {
    let seeds = unique(urls.iter().cloned());
    let seed_pages = fetch_all(fetcher, &seeds).await;
    if !expand {
        return seed_pages;
    }

    let ordered = unique(seed_pages.iter().flat_map(|page| {
        let mut urls = vec![page.url.clone()];
        if !page.is_empty() {
            let document = Html::parse_document(&page.html);
            urls.extend(RaceHeaderParser::related_race_urls(&document, base_url));
        }
        urls
    }));

    let mut fetched: HashMap<String, FetchedPage> =
        seed_pages.into_iter().map(|page| (page.url.clone(), page)).collect();
    let missing: Vec<String> = ordered.iter().filter(|u| !fetched.contains_key(*u)).cloned().collect();
    info!("Expanded {} seeds into {} race pages", seeds.len(), ordered.len());

    for page in fetch_all(fetcher, &missing).await {
        fetched.insert(page.url.clone(), page);
    }

    ordered.into_iter().filter_map(|url| fetched.remove(&url)).collect()
}

/// Keep the first occurrence of each URL
fn unique(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
