//! Falabella storefront scraping: locators, records, and the pagination engine.

pub mod engine;
pub mod models;
pub mod selectors;

pub use engine::{PageProbe, Scraper, ScraperSettings};
pub use models::{Harvest, Record, ScrapeReport, StopReason};
pub use selectors::SiteSelectors;
