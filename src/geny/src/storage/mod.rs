//! Tabular files: the entrant dataset, the track reference and generic sheets.

pub mod entrants;
pub mod reference;
pub mod spreadsheet;

pub use entrants::{read_entrants, write_entrants, write_entrants_xlsx};
pub use reference::TrackStatsTable;
pub use spreadsheet::{read_sheet, write_csv, write_formatted_xlsx, Sheet};
