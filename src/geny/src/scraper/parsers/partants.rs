//! Entrants ("partants") page parser.

use anyhow::{bail, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, warn};

use super::race_header::{RaceHeader, RaceHeaderParser};
use crate::config::ExtractionConfig;
use crate::normalize::{clean_odds, parse_gain, TrackNormalizer};
use crate::scraper::html::{element_text, row_cells, select_first, select_first_in};
use crate::types::{EntrantRecord, TrackStats};

/// One row of the entrants table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrapedEntrant {
    /// Saddle number, when the table shows one
    pub number: Option<u32>,
    pub name: String,
    pub gain: String,
    /// PMU odds, "0" when unquoted
    pub primary_odds: String,
    /// Odds of the column right after the PMU one, "0" when absent
    pub secondary_odds: String,
}

/// Everything extracted from one entrants page
#[derive(Debug, Clone)]
pub struct PartantsPage {
    pub url: String,
    pub header: RaceHeader,
    pub track: String,
    pub race_number: u32,
    pub entrants: Vec<ScrapedEntrant>,
}

/// Parser for entrants pages
pub struct PartantsParser;

impl PartantsParser {
    /// Parse an entrants page. Fails when the track, the race number or the
    /// entrants table cannot be read; nothing of the page is kept then.
    pub fn parse(document: &Html, url: &str, config: &ExtractionConfig) -> Result<PartantsPage> {
        let header = RaceHeaderParser::parse(document, url, config.race_number_rule, config.track_source);

        let Some(track) = header.track.clone() else {
            bail!("track not found on {url}");
        };
        let Some(race_number) = header.race_number else {
            bail!("race number not found on {url}");
        };
        let entrants = Self::extract_entrants(document);
        if entrants.is_empty() {
            bail!("no entrants found on {url}");
        }

        debug!("{} R{}: {} entrants", track, race_number, entrants.len());

        Ok(PartantsPage {
            url: url.to_string(),
            header,
            track,
            race_number,
            entrants,
        })
    }

    /// Rows of `table#tableau_partants`, columns resolved by header text
    pub fn extract_entrants(document: &Html) -> Vec<ScrapedEntrant> {
        let mut entrants = Vec::new();

        let Some(table) = select_first(document, "table#tableau_partants") else {
            error!("Entrants table 'table#tableau_partants' not found");
            return entrants;
        };

        let th_selector = Selector::parse("thead th").unwrap();
        let headers: Vec<String> = table.select(&th_selector).map(|th| element_text(&th)).collect();

        let gains_index = headers.iter().position(|h| h == "Gains");
        let odds_index = headers.iter().position(|h| h.contains("Cotes"));
        let (Some(gains_index), Some(odds_index)) = (gains_index, odds_index) else {
            error!("'Gains' or odds column not found in entrants table headers: {:?}", headers);
            return entrants;
        };
        // The secondary market sits right after the PMU column
        let secondary_index = Some(odds_index + 1).filter(|i| *i < headers.len());
        let number_index = headers.iter().position(|h| matches!(h.as_str(), "N°" | "N" | "Num"));

        let row_selector = Selector::parse("tbody tr").unwrap();
        for row in table.select(&row_selector) {
            if let Some(entrant) = Self::parse_entrant_row(&row, gains_index, odds_index, secondary_index, number_index) {
                entrants.push(entrant);
            }
        }

        entrants
    }

    fn parse_entrant_row(
        row: &ElementRef,
        gains_index: usize,
        odds_index: usize,
        secondary_index: Option<usize>,
        number_index: Option<usize>,
    ) -> Option<ScrapedEntrant> {
        let name_link = select_first_in(row, "span.leftWidth100 a.lienFiche").or_else(|| select_first_in(row, "a.lienFiche"))?;
        let name = element_text(&name_link);
        if name.is_empty() {
            return None;
        }

        let cells = row_cells(row);
        let cell_text = |index: usize| cells.get(index).map(element_text).unwrap_or_default();

        let mut gain = cell_text(gains_index);
        if gain.is_empty() {
            gain = "0".to_string();
        }

        Some(ScrapedEntrant {
            number: number_index.and_then(|i| cell_text(i).parse().ok()),
            name,
            gain,
            primary_odds: clean_odds(&cell_text(odds_index)),
            secondary_odds: secondary_index
                .map(|i| clean_odds(&cell_text(i)))
                .unwrap_or_else(|| "0".to_string()),
        })
    }
}

/// Odds to record for each entrant of a race.
///
/// When at least `threshold` primary quotes are "0", every entrant takes its
/// secondary quote prefixed with `marker`; otherwise primary quotes are used
/// untagged.
pub fn select_odds(entrants: &[ScrapedEntrant], threshold: usize, marker: &str) -> Vec<String> {
    let unquoted = entrants.iter().filter(|e| e.primary_odds == "0").count();

    if unquoted >= threshold {
        entrants
            .iter()
            .map(|e| format!("{}{}", marker, e.secondary_odds))
            .collect()
    } else {
        entrants.iter().map(|e| e.primary_odds.clone()).collect()
    }
}

/// Smallest and largest career earnings among the entrants; (0, 0) if none parse
pub fn gain_range(entrants: &[ScrapedEntrant]) -> (i64, i64) {
    let gains: Vec<i64> = entrants
        .iter()
        .filter_map(|e| {
            let parsed = parse_gain(&e.gain);
            if parsed.is_none() {
                warn!("Could not convert gain to an integer: {:?} ({})", e.gain, e.name);
            }
            parsed
        })
        .collect();

    match (gains.iter().min(), gains.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => (0, 0),
    }
}

impl PartantsPage {
    /// Turn the page into entrant records for the dataset
    pub fn to_records(&self, normalizer: &TrackNormalizer, stats: &TrackStats, config: &ExtractionConfig) -> Vec<EntrantRecord> {
        let odds = select_odds(&self.entrants, config.odds_fallback_threshold, &config.fallback_marker);
        let (gain_min, gain_max) = gain_range(&self.entrants);
        let track = normalizer.canonical(&self.track);

        self.entrants
            .iter()
            .zip(odds)
            .enumerate()
            .map(|(i, (entrant, odds))| EntrantRecord {
                date: self.header.date,
                track: track.clone(),
                race_number: self.race_number,
                horse_number: entrant.number.unwrap_or(i as u32 + 1),
                horse_name: entrant.name.clone(),
                runner_count: self.header.runner_count,
                gains: entrant.gain.clone(),
                purse: self.header.purse,
                gain_min,
                gain_max,
                odds,
                track_stats: stats.clone(),
                ..Default::default()
            })
            .collect()
    }
}
