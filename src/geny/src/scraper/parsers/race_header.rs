//! Race header fields shared by partants and arrivées pages.
//!
//! Date comes from the URL; track, race number, purse and declared runner
//! count come from the page heading and the `span.infoCourse` banner.

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{error, warn};

use crate::config::{RaceNumberRule, TrackSource};
use crate::scraper::html::{element_text, first_text, select_first};

static URL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/=](\d{4}-\d{2}-\d{2})-").unwrap());
static TRACK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\s*(.+?)\s*\(").unwrap());
static TRACK_CLEAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-zÀ-ÿ0-9\s-]").unwrap());
static PURSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\s\d+)?)\s*(?:000)?€").unwrap());
static RUNNERS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\s*(\d+)\s*Partants").unwrap());
static DISCIPLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(Mont[ée]e?|Attel[ée]e?)\b").unwrap());

/// Header fields of a race page; `None` where extraction failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceHeader {
    pub date: Option<NaiveDate>,
    pub track: Option<String>,
    pub race_number: Option<u32>,
    /// Purse in thousands of euros
    pub purse: Option<f64>,
    pub runner_count: Option<u32>,
}

/// Parser for race page headers
pub struct RaceHeaderParser;

impl RaceHeaderParser {
    /// Extract every header field, logging the ones that are missing
    pub fn parse(document: &Html, url: &str, race_number_rule: RaceNumberRule, track_source: TrackSource) -> RaceHeader {
        let (purse, runner_count) = match Self::extract_purse_and_runner_count(document) {
            Some((purse, runners)) => (Some(purse), Some(runners)),
            None => (None, None),
        };

        RaceHeader {
            date: Self::extract_date(url),
            track: Self::extract_track(document, track_source),
            race_number: Self::extract_race_number(document, race_number_rule),
            purse,
            runner_count,
        }
    }

    /// Date embedded in the URL as `YYYY-MM-DD-`
    pub fn extract_date(url: &str) -> Option<NaiveDate> {
        let parsed = URL_DATE_RE
            .captures(url)
            .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok());
        if parsed.is_none() {
            warn!("No date found in URL: {}", url);
        }
        parsed
    }

    /// Track name from the page heading, accents preserved
    pub fn extract_track(document: &Html, source: TrackSource) -> Option<String> {
        let raw = match source {
            TrackSource::ReunionHeading => {
                let Some(text) = first_text(document, "div.nomReunion") else {
                    error!("Track heading 'div.nomReunion' not found");
                    return None;
                };
                Self::track_from_heading(&text)
            }
            TrackSource::MeetingLink => {
                let selector = Selector::parse("#yui-main a").unwrap();
                let Some(link) = document.select(&selector).nth(1) else {
                    error!("Meeting link not found in '#yui-main'");
                    return None;
                };
                element_text(&link)
            }
        };

        let cleaned = TRACK_CLEAN_RE.replace_all(&raw, "");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            error!("Track name is empty after cleaning: {:?}", raw);
            return None;
        }
        Some(cleaned)
    }

    /// "Réunion 1 : VINCENNES (France) ..." -> "VINCENNES"
    fn track_from_heading(text: &str) -> String {
        if let Some(caps) = TRACK_RE.captures(text) {
            return caps[1].trim().to_string();
        }
        match text.split_once(':') {
            Some((_, rest)) => rest.split('(').next().unwrap_or("").trim().to_string(),
            None => text.trim().to_string(),
        }
    }

    /// Race number according to the configured rule
    pub fn extract_race_number(document: &Html, rule: RaceNumberRule) -> Option<u32> {
        let number = match rule {
            RaceNumberRule::FirstChar => {
                let Some(heading) = first_text(document, "span h1") else {
                    error!("Race number heading 'span h1' not found");
                    return None;
                };
                // The heading starts with the race number ("3 - Prix de ...")
                heading.chars().next().and_then(|c| c.to_digit(10))
            }
            RaceNumberRule::LeadingDigits => {
                let Some(heading) = first_text(document, "span h1") else {
                    error!("Race number heading 'span h1' not found");
                    return None;
                };
                let digits: String = heading.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            }
            RaceNumberRule::NumeroNode => {
                let Some(text) = first_text(document, "span.numeroCourse") else {
                    error!("Race number node 'span.numeroCourse' not found");
                    return None;
                };
                let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            }
        };

        if number.is_none() {
            error!("Race number could not be read ({:?})", rule);
        }
        number
    }

    /// Purse (thousands of euros) and declared runner count from the banner
    /// "Attelé - 30 000€ - 2850 mètres - 14 Partants"
    pub fn extract_purse_and_runner_count(document: &Html) -> Option<(f64, u32)> {
        let Some(text) = Self::info_text(document) else {
            error!("Race banner 'span.infoCourse' not found");
            return None;
        };

        let (Some(purse_caps), Some(runners)) = (PURSE_RE.captures(&text), runners_in(&text)) else {
            error!("Purse or runner count not found in banner: {:?}", text);
            return None;
        };

        let purse_digits: String = purse_caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
        let purse = purse_digits.parse::<u64>().ok()? as f64 / 1000.0;
        Some((purse, runners))
    }

    /// Declared runner count ("- 14 Partants") from the banner
    pub fn extract_runner_count(document: &Html) -> Option<u32> {
        let Some(text) = Self::info_text(document) else {
            error!("Race banner 'span.infoCourse' not found");
            return None;
        };
        let count = runners_in(&text);
        if count.is_none() {
            error!("Runner count not found in banner: {:?}", text);
        }
        count
    }

    /// Whether the banner announces a trot race (attelé or monté)
    pub fn is_trot_race(document: &Html) -> bool {
        match Self::info_text(document) {
            Some(text) => DISCIPLINE_RE.is_match(&text),
            None => {
                warn!("Race banner 'span.infoCourse' not found, discipline unknown");
                false
            }
        }
    }

    /// Links to the sibling races of the same meeting, resolved against `base_url`
    pub fn related_race_urls(document: &Html, base_url: &str) -> Vec<String> {
        let Ok(base) = Url::parse(base_url) else {
            error!("Invalid base URL: {}", base_url);
            return Vec::new();
        };
        let selector = Selector::parse("a[accesskey]").unwrap();

        document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .map(|url| url.to_string())
            .collect()
    }

    fn info_text(document: &Html) -> Option<String> {
        let node = select_first(document, "span.infoCourse")?;
        let text = node
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .replace("ï¿½", "")
            .replace('\u{fffd}', "");
        Some(text)
    }
}

fn runners_in(banner: &str) -> Option<u32> {
    RUNNERS_RE.captures(banner).and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div id="yui-main">
  <a href="/reunions-courses-pmu">Courses</a>
  <a href="/reunion/vincennes">Vincennes</a>
</div>
<div class="nomReunion">Réunion 1 : Marseille-Borély (France) - Lundi</div>
<span class="course"><h1>3 - Prix de Barbizon</h1></span>
<span class="numeroCourse fondVert">C3</span>
<span class="infoCourse">Attelé - 30 000€ - 2850 mètres - Corde à gauche - 14 Partants</span>
<div class="navigation">
  <a accesskey="1" href="/partants-pmu/2024-08-26-vincennes-pmu-prix-a_c1514558">C1</a>
  <a accesskey="2" href="/partants-pmu/2024-08-26-vincennes-pmu-prix-b_c1514559">C2</a>
  <a href="/other">other</a>
</div>
</body>
</html>"#;

    #[test]
    fn test_extract_date() {
        let url = "https://www.geny.com/partants-pmu/2024-08-26-vincennes-pmu-prix-de-barbizon_c1514560";
        assert_eq!(RaceHeaderParser::extract_date(url), NaiveDate::from_ymd_opt(2024, 8, 26));

        let query = "https://www.geny.com/arrivee-et-rapports-pmu?id_course=1515246&info=2024-08-29-Strasbourg-pmu-Prix+de+Vesoul";
        assert_eq!(RaceHeaderParser::extract_date(query), NaiveDate::from_ymd_opt(2024, 8, 29));

        assert_eq!(RaceHeaderParser::extract_date("https://www.geny.com/partants-pmu/"), None);
    }

    #[test]
    fn test_extract_track_from_heading() {
        let document = Html::parse_document(SAMPLE_HTML);
        let track = RaceHeaderParser::extract_track(&document, TrackSource::ReunionHeading);
        assert_eq!(track.as_deref(), Some("Marseille-Borély"));
    }

    #[test]
    fn test_extract_track_without_parenthesis() {
        assert_eq!(RaceHeaderParser::track_from_heading("Réunion 2 : Craon"), "Craon");
        assert_eq!(RaceHeaderParser::track_from_heading("Craon"), "Craon");
    }

    #[test]
    fn test_extract_track_from_meeting_link() {
        let document = Html::parse_document(SAMPLE_HTML);
        let track = RaceHeaderParser::extract_track(&document, TrackSource::MeetingLink);
        assert_eq!(track.as_deref(), Some("Vincennes"));
    }

    #[test]
    fn test_extract_track_missing_or_empty() {
        let document = Html::parse_document("<html><body></body></html>");
        assert!(RaceHeaderParser::extract_track(&document, TrackSource::ReunionHeading).is_none());

        let document = Html::parse_document(r#"<div class="nomReunion">Réunion : *** (x)</div>"#);
        assert!(RaceHeaderParser::extract_track(&document, TrackSource::ReunionHeading).is_none());
    }

    #[test]
    fn test_extract_race_number_rules() {
        let document = Html::parse_document(SAMPLE_HTML);
        assert_eq!(RaceHeaderParser::extract_race_number(&document, RaceNumberRule::FirstChar), Some(3));
        assert_eq!(RaceHeaderParser::extract_race_number(&document, RaceNumberRule::LeadingDigits), Some(3));
        assert_eq!(RaceHeaderParser::extract_race_number(&document, RaceNumberRule::NumeroNode), Some(3));

        let two_digits = Html::parse_document("<span><h1>12 - Prix d'Amérique</h1></span>");
        assert_eq!(RaceHeaderParser::extract_race_number(&two_digits, RaceNumberRule::FirstChar), Some(1));
        assert_eq!(RaceHeaderParser::extract_race_number(&two_digits, RaceNumberRule::LeadingDigits), Some(12));

        let no_digit = Html::parse_document("<span><h1>Prix d'Amérique</h1></span>");
        assert_eq!(RaceHeaderParser::extract_race_number(&no_digit, RaceNumberRule::FirstChar), None);
    }

    #[test]
    fn test_extract_purse_and_runner_count() {
        let document = Html::parse_document(SAMPLE_HTML);
        assert_eq!(RaceHeaderParser::extract_purse_and_runner_count(&document), Some((30.0, 14)));

        let half = Html::parse_document(r#"<span class="infoCourse">Monté - 22 500€ - 2700 mètres - 9 Partants</span>"#);
        assert_eq!(RaceHeaderParser::extract_purse_and_runner_count(&half), Some((22.5, 9)));

        let no_runners = Html::parse_document(r#"<span class="infoCourse">Plat - 18 000€ - 1600 mètres</span>"#);
        assert_eq!(RaceHeaderParser::extract_purse_and_runner_count(&no_runners), None);
    }

    #[test]
    fn test_extract_runner_count() {
        let document = Html::parse_document(SAMPLE_HTML);
        assert_eq!(RaceHeaderParser::extract_runner_count(&document), Some(14));

        let no_purse = Html::parse_document(r#"<span class="infoCourse">Attelé - 2100 mètres - 7 Partants</span>"#);
        assert_eq!(RaceHeaderParser::extract_runner_count(&no_purse), Some(7));
        assert_eq!(RaceHeaderParser::extract_purse_and_runner_count(&no_purse), None);

        let no_runners = Html::parse_document(r#"<span class="infoCourse">Plat - 18 000€ - 1600 mètres</span>"#);
        assert_eq!(RaceHeaderParser::extract_runner_count(&no_runners), None);
    }

    #[test]
    fn test_is_trot_race() {
        let document = Html::parse_document(SAMPLE_HTML);
        assert!(RaceHeaderParser::is_trot_race(&document));

        let flat = Html::parse_document(r#"<span class="infoCourse">Plat - 18 000€ - 1600 mètres - 10 Partants</span>"#);
        assert!(!RaceHeaderParser::is_trot_race(&flat));

        let monte = Html::parse_document(r#"<span class="infoCourse">Montée - 20 000€ - 8 Partants</span>"#);
        assert!(RaceHeaderParser::is_trot_race(&monte));
    }

    #[test]
    fn test_related_race_urls() {
        let document = Html::parse_document(SAMPLE_HTML);
        let urls = RaceHeaderParser::related_race_urls(&document, "https://www.geny.com/");
        assert_eq!(
            urls,
            vec![
                "https://www.geny.com/partants-pmu/2024-08-26-vincennes-pmu-prix-a_c1514558".to_string(),
                "https://www.geny.com/partants-pmu/2024-08-26-vincennes-pmu-prix-b_c1514559".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_combines_fields() {
        let document = Html::parse_document(SAMPLE_HTML);
        let header = RaceHeaderParser::parse(
            &document,
            "https://www.geny.com/partants-pmu/2024-08-26-vincennes-pmu-prix-de-barbizon_c1514560",
            RaceNumberRule::FirstChar,
            TrackSource::ReunionHeading,
        );
        assert_eq!(header.date, NaiveDate::from_ymd_opt(2024, 8, 26));
        assert_eq!(header.track.as_deref(), Some("Marseille-Borély"));
        assert_eq!(header.race_number, Some(3));
        assert_eq!(header.purse, Some(30.0));
        assert_eq!(header.runner_count, Some(14));
    }
}
