//! Record types shared by the scrapers, the reconciler and the tabular files.

use chrono::NaiveDate;

/// Display format of the `DATE` column
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Auxiliary track-statistics columns copied from the reference spreadsheet
pub const TRACK_STAT_COLUMNS: [&str; 9] = ["L1", "L2", "D-P", "D-C", "D-N", "D-L", "D-B", "D-C2", "A"];

/// Entrant dataset columns in output order
pub const ENTRANT_COLUMNS: [&str; 24] = [
    "DATE",
    "Hippodrome",
    "COURSE",
    "NumChev",
    "CHEVAL",
    "PLACE",
    "RAP-G",
    "RAP-P",
    "PARTANTS",
    "I-Gains",
    "I-Prix du jour",
    "I-Moins-Riche",
    "I-Plus-Riche",
    "Cotes-Pmu",
    "Statut",
    "L1",
    "L2",
    "D-P",
    "D-C",
    "D-N",
    "D-L",
    "D-B",
    "D-C2",
    "A",
];

/// Track statistics for one hippodrome, in `TRACK_STAT_COLUMNS` order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStats(pub [String; 9]);

impl Default for TrackStats {
    fn default() -> Self {
        Self(std::array::from_fn(|_| "0".to_string()))
    }
}

#[cfg(test)]
impl TrackStats {
    /// Value for a statistics column, if the column exists
    pub fn get(&self, column: &str) -> Option<&str> {
        TRACK_STAT_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.0[i].as_str())
    }
}

/// One row per (date, track, race number, horse number)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntrantRecord {
    pub date: Option<NaiveDate>,
    /// Canonical track name
    pub track: String,
    pub race_number: u32,
    pub horse_number: u32,
    pub horse_name: String,
    /// Finish position, set by the results merge
    pub place: Option<u8>,
    pub win_payout: Option<String>,
    pub place_payout: Option<String>,
    pub runner_count: Option<u32>,
    /// Career earnings as shown on the entrants page
    pub gains: String,
    /// Race purse in thousands of euros
    pub purse: Option<f64>,
    pub gain_min: i64,
    pub gain_max: i64,
    pub odds: String,
    pub status: String,
    pub track_stats: TrackStats,
}

impl EntrantRecord {
    /// Render the record as a row in `ENTRANT_COLUMNS` order
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            self.track.clone(),
            self.race_number.to_string(),
            self.horse_number.to_string(),
            self.horse_name.clone(),
            self.place.map(|p| p.to_string()).unwrap_or_default(),
            self.win_payout.clone().unwrap_or_default(),
            self.place_payout.clone().unwrap_or_default(),
            self.runner_count.map(|n| n.to_string()).unwrap_or_default(),
            self.gains.clone(),
            self.purse.map(format_thousands).unwrap_or_default(),
            self.gain_min.to_string(),
            self.gain_max.to_string(),
            self.odds.clone(),
            self.status.clone(),
        ];
        row.extend(self.track_stats.0.iter().cloned());
        row
    }

    /// Build a record from a row, looking columns up by header name.
    ///
    /// Returns `None` when a key column (`COURSE`, `NumChev`) is not an integer.
    /// Missing statistics columns default to "0".
    pub fn from_row(headers: &[String], row: &[String]) -> Option<Self> {
        let field = |name: &str| -> &str {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .map(|s| s.trim())
                .unwrap_or("")
        };
        let optional = |name: &str| -> Option<String> {
            let value = field(name);
            (!value.is_empty()).then(|| value.to_string())
        };

        let race_number = u32::try_from(parse_integral(field("COURSE"))?).ok()?;
        let horse_number = u32::try_from(parse_integral(field("NumChev"))?).ok()?;

        let mut track_stats = TrackStats::default();
        for (i, column) in TRACK_STAT_COLUMNS.iter().enumerate() {
            if let Some(value) = optional(column) {
                track_stats.0[i] = value;
            }
        }

        Some(Self {
            date: NaiveDate::parse_from_str(field("DATE"), DATE_FORMAT).ok(),
            track: field("Hippodrome").to_string(),
            race_number,
            horse_number,
            horse_name: field("CHEVAL").to_string(),
            place: parse_integral(field("PLACE")).map(|p| p.min(u8::MAX as u64) as u8),
            win_payout: optional("RAP-G"),
            place_payout: optional("RAP-P"),
            runner_count: parse_integral(field("PARTANTS")).and_then(|n| u32::try_from(n).ok()),
            gains: field("I-Gains").to_string(),
            purse: field("I-Prix du jour").parse().ok(),
            gain_min: field("I-Moins-Riche").parse().unwrap_or(0),
            gain_max: field("I-Plus-Riche").parse().unwrap_or(0),
            odds: field("Cotes-Pmu").to_string(),
            status: field("Statut").to_string(),
            track_stats,
        })
    }
}

/// Format a purse in thousands, integral when exact ("30", "22.5")
pub fn format_thousands(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Parse "3" or a spreadsheet-style "3.0" as an unsigned integer
fn parse_integral(text: &str) -> Option<u64> {
    if let Ok(n) = text.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = text.parse().ok()?;
    (f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}
