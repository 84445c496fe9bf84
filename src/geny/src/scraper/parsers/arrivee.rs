//! Results ("arrivée et rapports") page parser.
//!
//! Produces an [`ArrivalReport`]: finish places by horse number, announced
//! non-runners, and PMU simple win/place payouts.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{info, warn};

use super::race_header::RaceHeaderParser;
use crate::config::{ExtractionConfig, PlacePolicy};
use crate::normalize::canonical_amount;
use crate::scraper::html::{element_text, find_after_landmark, first_text, row_cells, select_first, select_first_in};

static NON_RUNNER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Non-partants?\s*:\s*(.*)").unwrap());

/// Label of the section holding PMU payouts
pub const PMU_LANDMARK: &str = "PMU";

/// Simple win/place payout for one horse, as decimal strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub win: String,
    pub place: String,
}

impl Default for Payout {
    fn default() -> Self {
        Self {
            win: "0".to_string(),
            place: "0".to_string(),
        }
    }
}

/// Everything a results page contributes to the merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrivalReport {
    pub url: String,
    /// Track name as shown on the page (not canonicalized)
    pub track: Option<String>,
    pub race_number: Option<u32>,
    /// Runners declared on the page banner
    pub runner_count: Option<u32>,
    /// Place per horse number, already classified
    pub finishes: HashMap<u32, u8>,
    pub non_runners: HashSet<u32>,
    pub payouts: HashMap<u32, Payout>,
}

/// Parser for results pages
pub struct ArriveeParser;

impl ArriveeParser {
    /// Parse a results page. When the track, race number or runner count is
    /// missing the report carries only the header fields it could read.
    pub fn parse(document: &Html, url: &str, config: &ExtractionConfig, policy: &PlacePolicy) -> ArrivalReport {
        let mut report = ArrivalReport {
            url: url.to_string(),
            track: RaceHeaderParser::extract_track(document, config.track_source),
            race_number: RaceHeaderParser::extract_race_number(document, config.race_number_rule),
            runner_count: RaceHeaderParser::extract_runner_count(document),
            ..Default::default()
        };

        if report.track.is_none() || report.race_number.is_none() || report.runner_count.is_none() {
            warn!("Race number, track or runner count missing on {}", url);
            return report;
        }

        report.finishes = Self::extract_results_table(document, policy);
        report.non_runners = Self::extract_non_runners(document);
        report.payouts = Self::extract_pool_payouts(document);
        report
    }

    /// Finish places from `table#arrivees`, keyed by horse number
    pub fn extract_results_table(document: &Html, policy: &PlacePolicy) -> HashMap<u32, u8> {
        let mut places = HashMap::new();

        let Some(table) = select_first(document, "table#arrivees") else {
            warn!("Results table 'table#arrivees' not found");
            return places;
        };

        let row_selector = Selector::parse("tr").unwrap();
        for row in table.select(&row_selector) {
            let cells = row_cells(&row);
            if cells.len() < 3 {
                continue;
            }

            let finish = element_text(&cells[0]);
            let number = element_text(&cells[1]);
            let Ok(number) = number.parse::<u32>() else {
                continue;
            };

            places.insert(number, classify_finish(&finish, policy));
        }

        places
    }

    /// Horse numbers listed in the `div.nonPartant` notice ("Non-partant : 4 - 11")
    pub fn extract_non_runners(document: &Html) -> HashSet<u32> {
        let Some(text) = first_text(document, "div.nonPartant") else {
            return HashSet::new();
        };

        match NON_RUNNER_RE.captures(&text) {
            Some(caps) => caps[1]
                .split('-')
                .filter_map(|n| n.trim().parse().ok())
                .collect(),
            None => {
                warn!("Unrecognized non-runner notice: {:?}", text);
                HashSet::new()
            }
        }
    }

    /// Simple win/place payouts from the table following the "PMU" section
    pub fn extract_pool_payouts(document: &Html) -> HashMap<u32, Payout> {
        let mut payouts: HashMap<u32, Payout> = HashMap::new();

        let Some(table) = find_after_landmark(document, "div", PMU_LANDMARK, "table") else {
            warn!("PMU payouts section not found");
            return payouts;
        };

        let row_selector = Selector::parse("tr").unwrap();
        for row in table.select(&row_selector) {
            let cells = row_cells(&row);
            if cells.len() < 2 {
                continue;
            }

            let number = select_first_in(&cells[0], "b").map(|b| element_text(&b));
            let bet_type = select_first_in(&cells[0], r#"div[style*="float: right"]"#)
                .or_else(|| select_first_in(&cells[0], r#"div[style*="float:right"]"#))
                .map(|d| element_text(&d));
            let amount = element_text(&cells[1]);

            let (Some(number), Some(bet_type)) = (number, bet_type) else {
                continue;
            };
            if amount.is_empty() {
                continue;
            }
            let Ok(number) = number.parse::<u32>() else {
                warn!("Non-numeric horse number in payouts: {:?}", number);
                continue;
            };

            let payout = payouts.entry(number).or_default();
            match bet_type.as_str() {
                "Gagnant" => payout.win = canonical_amount(&amount),
                "Placé" => payout.place = canonical_amount(&amount),
                other => warn!("Unknown payout type {:?} for horse {}", other, number),
            }
        }

        info!("Extracted PMU payouts for {} horses", payouts.len());
        payouts
    }
}

/// Place recorded for a finish text: disqualification codes map to the
/// disqualified place, numbers are capped, anything else is unplaced.
pub fn classify_finish(text: &str, policy: &PlacePolicy) -> u8 {
    let lowered = text.trim().to_lowercase();

    if policy
        .disqualified_codes
        .iter()
        .any(|code| !code.is_empty() && lowered.contains(&code.to_lowercase()))
    {
        return policy.disqualified_place;
    }

    if !lowered.is_empty() && lowered.chars().all(|c| c.is_ascii_digit()) {
        return match lowered.parse::<u32>() {
            Ok(n) => n.min(policy.max_place as u32) as u8,
            Err(_) => policy.max_place,
        };
    }

    policy.unplaced_place
}
