//! Track statistics reference spreadsheet ("FichierH"), keyed by hippodrome.

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::spreadsheet::{read_sheet, Sheet};
use crate::normalize::TrackNormalizer;
use crate::types::{TrackStats, TRACK_STAT_COLUMNS};

/// Statistics per canonical track name
#[derive(Debug, Clone, Default)]
pub struct TrackStatsTable {
    by_track: HashMap<String, TrackStats>,
}

impl TrackStatsTable {
    /// Load the reference file; the first row of each track wins
    pub fn load(path: &Path, normalizer: &TrackNormalizer) -> Result<Self> {
        let sheet = read_sheet(path)?;
        let table = Self::from_sheet(&sheet, normalizer);
        if table.is_empty() {
            warn!("No track statistics in {} (missing \"Hippodrome\" column?)", path.display());
        }
        info!("Loaded statistics for {} tracks from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_sheet(sheet: &Sheet, normalizer: &TrackNormalizer) -> Self {
        let mut by_track = HashMap::new();

        for row in &sheet.rows {
            let track = sheet.value(row, "Hippodrome");
            if track.is_empty() {
                continue;
            }

            let mut stats = TrackStats::default();
            for (i, column) in TRACK_STAT_COLUMNS.iter().enumerate() {
                let value = sheet.value(row, column);
                if !value.is_empty() {
                    stats.0[i] = value.to_string();
                }
            }
            by_track.entry(normalizer.canonical(track)).or_insert(stats);
        }

        Self { by_track }
    }

    /// Statistics for a track, all "0" when the track is unknown
    pub fn lookup(&self, track: &str, normalizer: &TrackNormalizer) -> TrackStats {
        let key = normalizer.canonical(track);
        match self.by_track.get(&key) {
            Some(stats) => stats.clone(),
            None => {
                debug!("No reference statistics for {}", key);
                TrackStats::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_track.is_empty()
    }
}
