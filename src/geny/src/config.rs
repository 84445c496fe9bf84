//! Configuration for the geny scraper.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// HTTP fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    crate::scraper::BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    concat!("geny-scraper/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
    /// Number of rotated log files kept on disk
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_console_level")]
    pub console_level: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_prefix() -> String {
    "geny-scraper".to_string()
}

fn default_max_files() -> usize {
    3
}

fn default_console_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: default_log_prefix(),
            max_files: default_max_files(),
            console_level: default_console_level(),
            file_level: default_file_level(),
        }
    }
}

/// Input and output file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_partants_output")]
    pub partants_output: String,
    #[serde(default = "default_arrivees_output")]
    pub arrivees_output: String,
    /// Track statistics spreadsheet keyed by "Hippodrome"
    #[serde(default = "default_reference")]
    pub reference: String,
}

fn default_partants_output() -> String {
    "donnees_courses_partants.csv".to_string()
}

fn default_arrivees_output() -> String {
    "donnees_courses_arrivees.csv".to_string()
}

fn default_reference() -> String {
    "FichierH.xls".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            partants_output: default_partants_output(),
            arrivees_output: default_arrivees_output(),
            reference: default_reference(),
        }
    }
}

/// Static URL lists, overridden by command-line arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlsConfig {
    #[serde(default)]
    pub partants: Vec<String>,
    #[serde(default)]
    pub arrivees: Vec<String>,
}

/// How the race number is read from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RaceNumberRule {
    /// First character of the `span h1` heading
    #[default]
    FirstChar,
    /// Leading digits of the `span h1` heading
    LeadingDigits,
    /// Dedicated `span.numeroCourse` node
    NumeroNode,
}

/// Where the track name is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// `div.nomReunion` heading ("Réunion 1 : VINCENNES (...)")
    #[default]
    ReunionHeading,
    /// Second link of the `#yui-main` container
    MeetingLink,
}

/// Extraction heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub race_number_rule: RaceNumberRule,
    #[serde(default)]
    pub track_source: TrackSource,
    /// Number of unquoted primary odds that switches a race to secondary odds
    #[serde(default = "default_odds_fallback_threshold")]
    pub odds_fallback_threshold: usize,
    #[serde(default = "default_fallback_marker")]
    pub fallback_marker: String,
    /// Keep only trot races (attelé / monté)
    #[serde(default)]
    pub discipline_filter: bool,
    /// Treat every URL as a seed and add its sibling races
    #[serde(default)]
    pub expand_meetings: bool,
}

fn default_odds_fallback_threshold() -> usize {
    5
}

fn default_fallback_marker() -> String {
    "(G) ".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            race_number_rule: RaceNumberRule::default(),
            track_source: TrackSource::default(),
            odds_fallback_threshold: default_odds_fallback_threshold(),
            fallback_marker: default_fallback_marker(),
            discipline_filter: false,
            expand_meetings: false,
        }
    }
}

/// Mapping from finish text to the recorded place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacePolicy {
    /// Case-insensitive substrings marking a disqualification or fall
    #[serde(default = "default_disqualified_codes")]
    pub disqualified_codes: Vec<String>,
    #[serde(default = "default_disqualified_place")]
    pub disqualified_place: u8,
    #[serde(default = "default_max_place")]
    pub max_place: u8,
    /// Place for unclassified codes and horses missing from the results
    #[serde(default = "default_unplaced_place")]
    pub unplaced_place: u8,
}

fn default_disqualified_codes() -> Vec<String> {
    vec!["dai".to_string(), "dpj".to_string(), "d".to_string()]
}

fn default_disqualified_place() -> u8 {
    15
}

fn default_max_place() -> u8 {
    12
}

fn default_unplaced_place() -> u8 {
    12
}

impl Default for PlacePolicy {
    fn default() -> Self {
        Self {
            disqualified_codes: default_disqualified_codes(),
            disqualified_place: default_disqualified_place(),
            max_place: default_max_place(),
            unplaced_place: default_unplaced_place(),
        }
    }
}

/// Track name aliases, keyed by canonical name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracksConfig {
    #[serde(default = "default_aliases")]
    pub aliases: HashMap<String, String>,
}

fn default_aliases() -> HashMap<String, String> {
    HashMap::from([("DIEPPE GENYBET".to_string(), "DIEPPE".to_string())])
}

impl Default for TracksConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

/// Merge behaviour for result pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Remove announced non-runners from the merged dataset
    #[serde(default)]
    pub drop_non_runners: bool,
    /// Value written to `Statut` for announced non-runners (empty disables)
    #[serde(default = "default_non_runner_status")]
    pub non_runner_status: String,
}

fn default_non_runner_status() -> String {
    "NP".to_string()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            drop_non_runners: false,
            non_runner_status: default_non_runner_status(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub urls: UrlsConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub places: PlacePolicy,
    #[serde(default)]
    pub tracks: TracksConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file)
            // Override with environment variables (GENY__FETCH__TIMEOUT_SECS, etc.)
            .add_source(
                config::Environment::with_prefix("GENY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.odds_fallback_threshold, 5);
        assert_eq!(config.extraction.fallback_marker, "(G) ");
        assert_eq!(config.extraction.race_number_rule, RaceNumberRule::FirstChar);
        assert_eq!(config.places.disqualified_place, 15);
        assert_eq!(config.places.max_place, 12);
        assert_eq!(config.logging.max_files, 3);
        assert_eq!(
            config.tracks.aliases.get("DIEPPE GENYBET").map(String::as_str),
            Some("DIEPPE")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geny.toml");
        std::fs::write(
            &path,
            r#"
[extraction]
race_number_rule = "leading_digits"
odds_fallback_threshold = 3

[places]
max_place = 10
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.extraction.race_number_rule, RaceNumberRule::LeadingDigits);
        assert_eq!(config.extraction.odds_fallback_threshold, 3);
        assert_eq!(config.places.max_place, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.places.disqualified_place, 15);
        assert_eq!(config.files.reference, "FichierH.xls");
    }
}
