//! HTML parsers for geny.com race pages.

pub mod arrivee;
pub mod partants;
pub mod race_header;

pub use arrivee::{ArrivalReport, ArriveeParser, Payout};
pub use partants::PartantsParser;
pub use race_header::RaceHeaderParser;
