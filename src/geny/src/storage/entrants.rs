//! The entrant dataset file: one row per horse, `ENTRANT_COLUMNS` header.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::spreadsheet::{read_sheet, write_csv, write_formatted_xlsx, Sheet};
use crate::types::{EntrantRecord, ENTRANT_COLUMNS};

/// Load entrant records from a CSV or spreadsheet file. Rows whose race or
/// horse number is not an integer are skipped with a warning.
pub fn read_entrants(path: &Path) -> Result<Vec<EntrantRecord>> {
    let sheet = read_sheet(path)?;
    let records = from_sheet(&sheet);
    info!("Loaded {} entrant records from {}", records.len(), path.display());
    Ok(records)
}

pub fn write_entrants(path: &Path, records: &[EntrantRecord]) -> Result<()> {
    write_csv(path, &to_sheet(records))
}

pub fn write_entrants_xlsx(path: &Path, records: &[EntrantRecord]) -> Result<()> {
    write_formatted_xlsx(path, &to_sheet(records))
}

fn from_sheet(sheet: &Sheet) -> Vec<EntrantRecord> {
    for required in ["Hippodrome", "COURSE", "NumChev"] {
        if sheet.column(required).is_none() {
            warn!("Entrant file has no {:?} column", required);
        }
    }

    sheet
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let record = EntrantRecord::from_row(&sheet.headers, row);
            if record.is_none() {
                warn!("Skipping entrant row {}: bad COURSE or NumChev", i + 2);
            }
            record
        })
        .collect()
}

fn to_sheet(records: &[EntrantRecord]) -> Sheet {
    Sheet {
        headers: ENTRANT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: records.iter().map(EntrantRecord::to_row).collect(),
    }
}
