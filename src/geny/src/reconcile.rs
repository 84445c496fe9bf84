//! Merging scraped results into the entrant dataset.

use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::config::{PlacePolicy, ReconcileConfig};
use crate::normalize::TrackNormalizer;
use crate::scraper::parsers::{ArrivalReport, Payout};
use crate::types::EntrantRecord;

/// Merge one results page into the entrant records.
///
/// Records of the page's race (same canonical track and race number) get
/// their place, payouts and runner count; announced non-runners keep their
/// prior place and payouts. Every other record passes through unchanged.
/// A report without track, race number or runner count leaves the records
/// untouched.
pub fn merge(
    records: Vec<EntrantRecord>,
    report: &ArrivalReport,
    normalizer: &TrackNormalizer,
    policy: &PlacePolicy,
    options: &ReconcileConfig,
) -> Vec<EntrantRecord> {
    let (Some(track), Some(race_number), Some(runner_count)) =
        (report.track.as_deref(), report.race_number, report.runner_count)
    else {
        error!("Race number, track or runner count missing in results from {}, merge skipped", report.url);
        return records;
    };
    let track = normalizer.canonical(track);

    let mut matched = 0usize;
    let mut scratched = 0usize;
    let mut merged = Vec::with_capacity(records.len());

    for mut record in records {
        if record.race_number != race_number || normalizer.canonical(&record.track) != track {
            merged.push(record);
            continue;
        }
        matched += 1;

        if report.non_runners.contains(&record.horse_number) {
            scratched += 1;
            if options.drop_non_runners {
                continue;
            }
            if !options.non_runner_status.is_empty() {
                record.status = options.non_runner_status.clone();
            }
            merged.push(record);
            continue;
        }

        let payout = report
            .payouts
            .get(&record.horse_number)
            .cloned()
            .unwrap_or_default();
        let Payout { win, place } = payout;
        record.win_payout = Some(win);
        record.place_payout = Some(place);
        record.place = Some(
            report
                .finishes
                .get(&record.horse_number)
                .copied()
                .unwrap_or(policy.unplaced_place),
        );
        record.runner_count = Some(runner_count);
        merged.push(record);
    }

    if matched == 0 {
        warn!("No entrant records for {} R{} ({})", track, race_number, report.url);
    } else {
        info!(
            "Merged {} R{}: {} records, {} non-runners",
            track, race_number, matched, scratched
        );
    }

    merged
}

/// Order records by canonical track, race number, then place (unplaced last)
pub fn sort_for_output(records: &mut [EntrantRecord], normalizer: &TrackNormalizer) {
    records.sort_by_cached_key(|r| {
        (
            normalizer.canonical(&r.track),
            r.race_number,
            r.place.map_or(u16::MAX, u16::from),
            r.horse_number,
        )
    });
}

/// Drop records repeating an earlier (track, race number, horse number) key
pub fn dedupe(records: Vec<EntrantRecord>, normalizer: &TrackNormalizer) -> Vec<EntrantRecord> {
    let mut seen = HashSet::new();
    let before = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|r| seen.insert((normalizer.canonical(&r.track), r.race_number, r.horse_number)))
        .collect();

    if kept.len() < before {
        warn!("Dropped {} duplicate entrant records", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn record(track: &str, race: u32, horse: u32) -> EntrantRecord {
        EntrantRecord {
            track: track.to_string(),
            race_number: race,
            horse_number: horse,
            horse_name: format!("H{horse}"),
            ..Default::default()
        }
    }

    fn report(track: &str, race: u32) -> ArrivalReport {
        ArrivalReport {
            url: "https://www.geny.com/arrivee-et-rapports-pmu?id_course=1".to_string(),
            track: Some(track.to_string()),
            race_number: Some(race),
            runner_count: Some(8),
            ..Default::default()
        }
    }

    fn normalizer() -> TrackNormalizer {
        TrackNormalizer::new(&HashMap::from([("Dieppe Genybet".to_string(), "Dieppe".to_string())]))
    }

    fn run(records: Vec<EntrantRecord>, report: &ArrivalReport) -> Vec<EntrantRecord> {
        merge(records, report, &normalizer(), &PlacePolicy::default(), &ReconcileConfig::default())
    }

    #[test]
    fn test_merge_single_winner() {
        let mut arrival = report("VINCENNES", 1);
        arrival.finishes = HashMap::from([(3, 1)]);
        arrival.payouts = HashMap::from([(
            3,
            Payout {
                win: "10.00".to_string(),
                place: "3.00".to_string(),
            },
        )]);

        let merged = run(vec![record("VINCENNES", 1, 3)], &arrival);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].place, Some(1));
        assert_eq!(merged[0].win_payout.as_deref(), Some("10.00"));
        assert_eq!(merged[0].place_payout.as_deref(), Some("3.00"));
        assert_eq!(merged[0].runner_count, Some(8));
    }

    #[test]
    fn test_merge_defaults_for_missing_horse() {
        let arrival = report("VINCENNES", 1);
        let merged = run(vec![record("VINCENNES", 1, 6)], &arrival);

        assert_eq!(merged[0].place, Some(12));
        assert_eq!(merged[0].win_payout.as_deref(), Some("0"));
        assert_eq!(merged[0].place_payout.as_deref(), Some("0"));
    }

    #[test]
    fn test_merge_disqualified() {
        let mut arrival = report("VINCENNES", 1);
        arrival.finishes = HashMap::from([(5, 15)]);
        let merged = run(vec![record("VINCENNES", 1, 5)], &arrival);
        assert_eq!(merged[0].place, Some(15));
    }

    #[test]
    fn test_merge_matches_canonical_track() {
        let mut arrival = report("Marseille-Borély", 2);
        arrival.finishes = HashMap::from([(1, 2)]);
        let merged = run(vec![record("MARSEILLE BORELY", 2, 1)], &arrival);
        assert_eq!(merged[0].place, Some(2));

        let mut alias = report("Dieppe Genybet", 4);
        alias.finishes = HashMap::from([(1, 3)]);
        let merged = run(vec![record("DIEPPE", 4, 1)], &alias);
        assert_eq!(merged[0].place, Some(3));
    }

    #[test]
    fn test_merge_leaves_other_races_untouched() {
        let mut arrival = report("VINCENNES", 1);
        arrival.finishes = HashMap::from([(1, 1), (2, 2)]);
        let records = vec![record("VINCENNES", 2, 1), record("CRAON", 1, 2), record("VINCENNES", 1, 2)];

        let merged = run(records.clone(), &arrival);

        assert_eq!(merged[0], records[0]);
        assert_eq!(merged[1], records[1]);
        assert_eq!(merged[2].place, Some(2));
    }

    #[test]
    fn test_merge_non_runners_keep_prior_values() {
        let mut arrival = report("VINCENNES", 1);
        arrival.finishes = HashMap::from([(4, 1)]);
        arrival.non_runners = HashSet::from([4]);
        arrival.payouts = HashMap::from([(4, Payout::default())]);

        let merged = run(vec![record("VINCENNES", 1, 4), record("VINCENNES", 1, 5)], &arrival);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].place, None);
        assert_eq!(merged[0].win_payout, None);
        assert_eq!(merged[0].place_payout, None);
        assert_eq!(merged[0].status, "NP");
        assert_eq!(merged[1].place, Some(12));
    }

    #[test]
    fn test_merge_drops_non_runners_when_asked() {
        let mut arrival = report("VINCENNES", 1);
        arrival.non_runners = HashSet::from([4]);
        let options = ReconcileConfig {
            drop_non_runners: true,
            ..Default::default()
        };

        let merged = merge(
            vec![record("VINCENNES", 1, 4), record("VINCENNES", 1, 5)],
            &arrival,
            &normalizer(),
            &PlacePolicy::default(),
            &options,
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].horse_number, 5);
    }

    #[test]
    fn test_merge_rejects_incomplete_report() {
        let mut arrival = report("VINCENNES", 1);
        arrival.race_number = None;
        arrival.finishes = HashMap::from([(1, 1)]);
        let records = vec![record("VINCENNES", 1, 1)];

        assert_eq!(run(records.clone(), &arrival), records);

        let mut arrival = report("VINCENNES", 1);
        arrival.track = None;
        assert_eq!(run(records.clone(), &arrival), records);
    }

    #[test]
    fn test_merge_preserves_race_size() {
        let mut arrival = report("PAU", 3);
        arrival.finishes = (1..=6).map(|n| (n, n as u8)).collect();
        arrival.non_runners = HashSet::from([7]);
        let records: Vec<_> = (1..=9).map(|n| record("PAU", 3, n)).collect();

        let merged = run(records, &arrival);
        assert_eq!(merged.iter().filter(|r| r.race_number == 3).count(), 9);
    }

    #[test]
    fn test_merge_rejects_report_without_runner_count() {
        let mut arrival = report("PAU", 3);
        arrival.runner_count = None;
        let mut existing = record("PAU", 3, 1);
        existing.place = Some(1);
        existing.win_payout = Some("10.00".to_string());
        existing.runner_count = Some(10);
        let records = vec![existing, record("PAU", 3, 2)];

        assert_eq!(run(records.clone(), &arrival), records);
    }

    #[test]
    fn test_sort_for_output() {
        let mut a = record("VINCENNES", 2, 1);
        a.place = Some(3);
        let mut b = record("VINCENNES", 2, 2);
        b.place = Some(1);
        let c = record("CRAON", 10, 1);
        let mut d = record("CRAON", 9, 4);
        d.place = Some(2);
        let mut e = record("VINCENNES", 1, 7);
        e.place = Some(12);

        let mut records = vec![a, b, c, d, e];
        sort_for_output(&mut records, &normalizer());

        let keys: Vec<_> = records.iter().map(|r| (r.track.as_str(), r.race_number, r.place)).collect();
        assert_eq!(
            keys,
            vec![
                ("CRAON", 9, Some(2)),
                ("CRAON", 10, None),
                ("VINCENNES", 1, Some(12)),
                ("VINCENNES", 2, Some(1)),
                ("VINCENNES", 2, Some(3)),
            ]
        );
    }

    #[test]
    fn test_dedupe() {
        let records = vec![record("PAU", 1, 1), record("Pau", 1, 1), record("PAU", 1, 2)];
        let kept = dedupe(records, &normalizer());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].track, "PAU");
    }
}
