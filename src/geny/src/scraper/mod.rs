//! Web scraper module for geny.com
//!
//! Provides page fetching, DOM helpers and the partants/arrivées parsers.

pub mod fetcher;
pub mod html;
pub mod parsers;

pub use fetcher::{fetch_all, FetchedPage, HttpFetcher, PageFetcher};

/// Base URL for geny.com
pub const BASE_URL: &str = "https://www.geny.com/";
