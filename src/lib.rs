//! falabella-scraper - Paginated product scraper for Falabella search results
//!
//! Drives a browser (or captured HTML screens) through a product search,
//! collects every listing across all result pages, and stores the records
//! in a spreadsheet and a SQLite table.

pub mod commands;
pub mod config;
pub mod driver;
pub mod export;
pub mod falabella;
pub mod format;
pub mod retry;

pub use config::Config;
pub use driver::{Locator, PageDriver};
pub use falabella::{Record, ScrapeReport, Scraper, ScraperSettings, StopReason};
