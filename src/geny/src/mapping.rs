//! Place mapping: looks up each "I-Place" value of a depart sheet in the
//! reference list and reports the matching place and runner count.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::storage::{read_sheet, write_formatted_xlsx, Sheet};

/// Number of I-Place columns in a depart sheet
pub const PLACE_SLOTS: usize = 4;

const INPUT_PREFIX: &str = "I-Place";

/// Build the mapping sheet: `T-Place-i`, `Place-i`, `NbrPartants-i` for
/// every slot. Fails when the depart sheet lacks an `I-Place-i` column.
pub fn map_places(depart: &Sheet, reference: &Sheet) -> Result<Sheet> {
    let mut slots = Vec::with_capacity(PLACE_SLOTS);
    for i in 1..=PLACE_SLOTS {
        let name = format!("{INPUT_PREFIX}-{i}");
        let Some(index) = depart.column(&name) else {
            bail!("Depart sheet has no {name:?} column");
        };
        slots.push(index);
    }

    let mut headers = Vec::with_capacity(PLACE_SLOTS * 3);
    for i in 1..=PLACE_SLOTS {
        headers.push(format!("T-Place-{i}"));
        headers.push(format!("Place-{i}"));
        headers.push(format!("NbrPartants-{i}"));
    }

    let mut sheet = Sheet::new(headers);
    for row in &depart.rows {
        let mut out = Vec::with_capacity(PLACE_SLOTS * 3);
        for &index in &slots {
            let value = row.get(index).map(|v| v.trim()).unwrap_or("");
            let (place, runners) = find_match(value, reference).unwrap_or_default();
            out.push(value.to_string());
            out.push(place);
            out.push(runners);
        }
        sheet.rows.push(out);
    }

    Ok(sheet)
}

/// First reference row holding `value` in an `I-Place*` column, scanning
/// columns in sheet order; yields that row's `Place*` and `NbrPartants*`
/// cells of the same suffix. Empty values never match.
pub fn find_match(value: &str, reference: &Sheet) -> Option<(String, String)> {
    if value.is_empty() {
        return None;
    }

    for (col, header) in reference.headers.iter().enumerate() {
        let Some(suffix) = header.strip_prefix(INPUT_PREFIX) else {
            continue;
        };
        let Some(row) = reference.rows.iter().find(|r| r.get(col).map(|v| v.trim()) == Some(value)) else {
            continue;
        };

        let place = reference.value(row, &format!("Place{suffix}")).to_string();
        let runners = reference.value(row, &format!("NbrPartants{suffix}")).to_string();
        debug!("{} matched in {}: place {:?}, runners {:?}", value, header, place, runners);
        return Some((place, runners));
    }

    None
}

/// Read both sheets, map, and write the formatted result
pub fn run_mapping(depart: &Path, reference: &Path, output: &Path) -> Result<usize> {
    let depart = read_sheet(depart)?;
    let reference = read_sheet(reference)?;

    let mapped = map_places(&depart, &reference)?;
    write_formatted_xlsx(output, &mapped)?;

    info!("Mapped {} rows into {}", mapped.rows.len(), output.display());
    Ok(mapped.rows.len())
}
