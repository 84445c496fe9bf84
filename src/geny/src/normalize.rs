//! Text normalization for track names, amounts and odds.
//!
//! Records scraped from different pages are joined on these canonical forms,
//! so every function here is idempotent.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());

/// Canonicalizes track names: accents stripped, uppercase, hyphens as
/// spaces, whitespace collapsed, then known aliases resolved.
#[derive(Debug, Clone, Default)]
pub struct TrackNormalizer {
    aliases: HashMap<String, String>,
}

impl TrackNormalizer {
    /// Build a normalizer from an alias table. Keys and values are
    /// canonicalized so the table may be written in any case or accenting.
    /// Chained aliases resolve to the end of the chain; a cycle stops at
    /// the last name before it repeats.
    pub fn new(aliases: &HashMap<String, String>) -> Self {
        let direct: HashMap<String, String> = aliases
            .iter()
            .map(|(from, to)| (fold_track_name(from), fold_track_name(to)))
            .filter(|(from, to)| from != to)
            .collect();

        let aliases = direct
            .keys()
            .filter_map(|from| {
                let mut seen = HashSet::from([from.as_str()]);
                let mut target = direct.get(from)?;
                while let Some(next) = direct.get(target) {
                    if !seen.insert(target.as_str()) {
                        break;
                    }
                    target = next;
                }
                (target != from).then(|| (from.clone(), target.clone()))
            })
            .collect();
        Self { aliases }
    }

    /// Canonical form of a track name
    pub fn canonical(&self, raw: &str) -> String {
        let folded = fold_track_name(raw);
        match self.aliases.get(&folded) {
            Some(target) => target.clone(),
            None => folded,
        }
    }
}

/// Canonical track name without alias resolution
pub fn fold_track_name(raw: &str) -> String {
    let ascii = deunicode::deunicode(raw).to_uppercase().replace('-', " ");
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a currency amount to a plain decimal string.
///
/// "1 234,50 €" and "1.234,50" -> "1234.50"; empty or non-numeric input -> "0".
pub fn canonical_amount(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£'))
        .collect();

    // With a comma decimal, dots are group separators
    let cleaned = if stripped.contains(',') {
        stripped.replace('.', "").replace(',', ".")
    } else {
        stripped
    };

    if AMOUNT_RE.is_match(&cleaned) {
        cleaned
    } else {
        "0".to_string()
    }
}

/// Clean an odds cell: non-printable-ASCII bytes and bare hyphens ("no
/// quote") removed, quotes trimmed, comma decimals converted. Blank -> "0".
pub fn clean_odds(raw: &str) -> String {
    let printable: String = raw
        .chars()
        .filter(|c| (' '..='~').contains(c) && *c != '-')
        .collect();
    let cleaned = printable.trim().trim_matches('"').trim().replace(',', ".");

    if cleaned.is_empty() {
        "0".to_string()
    } else {
        cleaned
    }
}

/// Parse a career earnings cell ("123 456 €") into whole euros
pub fn parse_gain(raw: &str) -> Option<i64> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    digits.parse().ok()
}
