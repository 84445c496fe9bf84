//! Day-of-year and day-gap columns for a sheet of race dates.

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use std::path::Path;
use tracing::{info, warn};

use crate::storage::{read_sheet, write_csv, Sheet};
use crate::types::DATE_FORMAT;

/// Reference date of each row
pub const DAY_COLUMN: &str = "Date-du-Jour";

/// Number of `Date-i` columns compared with the reference date
pub const DATE_SLOTS: usize = 4;

/// Append `Nieme jour` and `Nbr-jours-i` to every row; date cells are
/// re-rendered as day/month/year. Fails when `Date-du-Jour` is missing.
pub fn compute_dates(input: &Sheet) -> Result<Sheet> {
    let Some(day_index) = input.column(DAY_COLUMN) else {
        bail!("Input sheet has no {DAY_COLUMN:?} column");
    };
    let slot_indices: Vec<Option<usize>> = (1..=DATE_SLOTS)
        .map(|i| {
            let index = input.column(&format!("Date-{i}"));
            if index.is_none() {
                warn!("Input sheet has no \"Date-{}\" column", i);
            }
            index
        })
        .collect();

    let mut headers = input.headers.clone();
    headers.push("Nieme jour".to_string());
    headers.extend((1..=DATE_SLOTS).map(|i| format!("Nbr-jours-{i}")));

    let mut sheet = Sheet::new(headers);
    for (line, row) in input.rows.iter().enumerate() {
        let mut out = row.clone();
        out.resize(input.headers.len(), String::new());

        let day = parse_date(&out[day_index]);
        for index in std::iter::once(day_index).chain(slot_indices.iter().flatten().copied()) {
            if let Some(date) = parse_date(&out[index]) {
                out[index] = date.format(DATE_FORMAT).to_string();
            }
        }

        let Some(day) = day else {
            warn!("Row {}: unreadable {} {:?}", line + 2, DAY_COLUMN, row.get(day_index));
            out.extend(std::iter::repeat(String::new()).take(DATE_SLOTS + 1));
            sheet.rows.push(out);
            continue;
        };

        out.push(day.ordinal().to_string());
        for (i, index) in slot_indices.iter().enumerate() {
            let other = index.and_then(|idx| parse_date(&out[idx]));
            match other {
                Some(other) => out.push((other - day).num_days().abs().to_string()),
                None => {
                    warn!("Row {}: unreadable Date-{}", line + 2, i + 1);
                    out.push(String::new());
                }
            }
        }
        sheet.rows.push(out);
    }

    Ok(sheet)
}

/// "26/08/2024", or the ISO form some spreadsheets store
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
}

/// Read the input sheet, compute, and write the CSV result
pub fn run_dates(input: &Path, output: &Path) -> Result<usize> {
    let sheet = compute_dates(&read_sheet(input)?)?;
    write_csv(output, &sheet)?;
    info!("Computed dates for {} rows into {}", sheet.rows.len(), output.display());
    Ok(sheet.rows.len())
}

/// `<stem>_resultat.csv` next to the input file
pub fn default_output(input: &Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "dates".to_string());
    input.with_file_name(format!("{stem}_resultat.csv"))
}
