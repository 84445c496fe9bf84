//! Row-oriented tables read from CSV or spreadsheet files, and written back
//! as BOM-prefixed CSV or formatted xlsx.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::types::DATE_FORMAT;

const BOM: char = '\u{feff}';

/// A header row plus data rows, every cell rendered as text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Index of a column by exact header text
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Trimmed cell of `row` under `name`, empty when either is missing
    pub fn value<'a>(&self, row: &'a [String], name: &str) -> &'a str {
        self.column(name)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// Read the first sheet of a workbook, or a CSV file when the extension says so
pub fn read_sheet(path: &Path) -> Result<Sheet> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        read_csv(path)
    } else {
        read_workbook(path)
    }
}

/// Read a CSV file; a leading UTF-8 BOM is ignored and short rows are padded
pub fn read_csv(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches(BOM).trim().to_string())
        .collect();

    let mut sheet = Sheet::new(headers);
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV row {} in {}", i + 2, path.display()))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(sheet.headers.len().max(row.len()), String::new());
        sheet.rows.push(row);
    }

    info!("Read {} rows from {}", sheet.rows.len(), path.display());
    Ok(sheet)
}

/// Read the first worksheet of an xls/xlsx/ods workbook
pub fn read_workbook(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("No worksheet in {}", path.display()))?
        .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => Vec::new(),
    };

    let mut sheet = Sheet::new(headers);
    sheet.rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    info!("Read {} rows from {}", sheet.rows.len(), path.display());
    Ok(sheet)
}

/// Text of a spreadsheet cell: integral floats without a fraction, dates
/// as day/month/year, empty and error cells as ""
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Write a sheet as CSV with a UTF-8 BOM
pub fn write_csv(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write!(file, "{BOM}")?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {} rows to {}", sheet.rows.len(), path.display());
    Ok(())
}

/// Write a sheet as xlsx: every cell centered, bold header, each column as
/// wide as its longest value plus padding. Numeric text is stored as numbers.
pub fn write_formatted_xlsx(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let centered = Format::new().set_align(FormatAlign::Center);
    let header = Format::new().set_align(FormatAlign::Center).set_bold();

    for (col, name) in sheet.headers.iter().enumerate() {
        let col = u16::try_from(col).context("Too many columns for xlsx")?;
        worksheet.write_string_with_format(0, col, name, &header)?;
    }

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = u32::try_from(i + 1).context("Too many rows for xlsx")?;
        for (col, value) in row.iter().enumerate() {
            let col = u16::try_from(col).context("Too many columns for xlsx")?;
            match numeric_value(value) {
                Some(n) => worksheet.write_number_with_format(r, col, n, &centered)?,
                None => worksheet.write_string_with_format(r, col, value, &centered)?,
            };
        }
    }

    for (col, width) in column_widths(sheet).into_iter().enumerate() {
        let col = u16::try_from(col).context("Too many columns for xlsx")?;
        worksheet.set_column_width(col, width)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;

    info!("Wrote {} rows to {}", sheet.rows.len(), path.display());
    Ok(())
}

/// Column width: (longest header or value + 2) * 1.2
fn column_widths(sheet: &Sheet) -> Vec<f64> {
    sheet
        .headers
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let longest = sheet
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|v| v.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0);
            (longest as f64 + 2.0) * 1.2
        })
        .collect()
}

/// Plain decimal text ("12", "3.5") as a number; leading zeros, signs and
/// anything else stay text
fn numeric_value(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if t.len() > 1 && t.starts_with('0') && !t.starts_with("0.") {
        return None;
    }
    t.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sheet {
        Sheet {
            headers: vec!["Hippodrome".to_string(), "COURSE".to_string(), "Cotes-Pmu".to_string()],
            rows: vec![
                vec!["VINCENNES".to_string(), "1".to_string(), "(G) 2.1".to_string()],
                vec!["CRAON".to_string(), "2".to_string(), "4.5".to_string()],
            ],
        }
    }

    #[test]
    fn test_csv_roundtrip_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&path, &sample()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with("\u{feff}".as_bytes()));

        let sheet = read_sheet(&path).unwrap();
        assert_eq!(sheet, sample());
        assert_eq!(sheet.value(&sheet.rows[1], "Hippodrome"), "CRAON");
        assert_eq!(sheet.value(&sheet.rows[1], "Missing"), "");
    }

    #[test]
    fn test_read_csv_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "A,B,C\n1,2\n").unwrap();

        let sheet = read_csv(&path).unwrap();
        assert_eq!(sheet.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_xlsx_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        write_formatted_xlsx(&path, &sample()).unwrap();
        let sheet = read_sheet(&path).unwrap();

        assert_eq!(sheet.headers, sample().headers);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][1], "1");
        assert_eq!(sheet.rows[0][2], "(G) 2.1");
        assert_eq!(sheet.rows[1][2], "4.5");
    }

    #[test]
    fn test_column_widths() {
        let widths = column_widths(&sample());
        assert!((widths[0] - 14.4).abs() < 1e-9);
        assert!((widths[1] - 9.6).abs() < 1e-9);
        assert!((widths[2] - 13.2).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value("12"), Some(12.0));
        assert_eq!(numeric_value("3.5"), Some(3.5));
        assert_eq!(numeric_value("0"), Some(0.0));
        assert_eq!(numeric_value("007"), None);
        assert_eq!(numeric_value("02/09/2024"), None);
        assert_eq!(numeric_value("(G) 2.1"), None);
        assert_eq!(numeric_value(""), None);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("PAU".to_string())), "PAU");
    }
}
