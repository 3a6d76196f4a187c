//! Search command implementation.

use crate::config::Config;
use crate::driver::PageDriver;
use crate::export::{spreadsheet, ProductStore};
use crate::falabella::{Record, ScrapeReport, Scraper, ScraperSettings, StopReason};
use crate::format::Formatter;
use anyhow::{bail, Result};
use std::time::Duration;
use tracing::{error, info};

#[cfg(feature = "webdriver")]
use crate::driver::WebDriverSession;
#[cfg(feature = "webdriver")]
use anyhow::Context;
#[cfg(feature = "webdriver")]
use tracing::warn;

/// Result of a search: the run report, the formatted records, and status notes.
#[derive(Debug)]
pub struct SearchOutcome {
    pub report: ScrapeReport,
    /// Records rendered in the configured format
    pub output: String,
    /// Human-readable progress and export messages
    pub notes: Vec<String>,
}

/// Scrapes every result page for a query and stores the records.
pub struct SearchCommand {
    config: Config,
    export: bool,
}

impl SearchCommand {
    /// Creates a new search command that exports its results.
    pub fn new(config: Config) -> Self {
        Self { config, export: true }
    }

    /// Skips the spreadsheet and database exports.
    pub fn without_export(mut self) -> Self {
        self.export = false;
        self
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms.max(1))
    }

    /// Opens a browser session, runs the search, and always closes the session.
    #[cfg(feature = "webdriver")]
    pub async fn execute(&self, query: &str) -> Result<SearchOutcome> {
        info!("Starting browser session at {}", self.config.browser.webdriver_url);
        let session = WebDriverSession::connect(&self.config.browser, self.poll_interval())
            .await
            .context("Failed to start browser session")?;

        let result = tokio::select! {
            outcome = self.execute_with_driver(&session, query) => outcome,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted by user");
                Err(anyhow::anyhow!("Interrupted by user"))
            }
        };

        info!("Closing browser session");
        if let Err(e) = session.quit().await {
            warn!("Failed to close browser session: {:#}", e);
        }

        result
    }

    /// Runs the search with a provided driver (replay and tests).
    pub async fn execute_with_driver<D: PageDriver>(
        &self,
        driver: &D,
        query: &str,
    ) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            bail!("A product name is required");
        }

        info!("Starting scrape for: {}", query);

        let scraper = Scraper::new(driver, ScraperSettings::from(&self.config));
        let report = scraper.run(query).await;

        let formatter = Formatter::new(self.config.format);
        let output = formatter.format_records(&report.records);

        let mut notes = Vec::new();

        if report.is_empty() {
            notes.push(match report.stop {
                StopReason::SearchFailed => "Search failed; no products collected".to_string(),
                _ => "No products found".to_string(),
            });
            return Ok(SearchOutcome { report, output, notes });
        }

        notes.push(format!(
            "Total products found: {} across {} page(s) ({})",
            report.count(),
            report.pages_visited(),
            report.stop
        ));

        if self.export {
            notes.extend(self.export_records(&report.records));
        }

        Ok(SearchOutcome { report, output, notes })
    }

    /// Writes the spreadsheet and inserts into the database.
    ///
    /// A failed export is reported and does not stop the other one.
    fn export_records(&self, records: &[Record]) -> Vec<String> {
        let mut notes = Vec::new();
        let sheet = &self.config.output.spreadsheet;
        let database = &self.config.output.database;

        match spreadsheet::save(sheet, records) {
            Ok(rows) => notes.push(format!("Spreadsheet saved: {} ({} rows)", sheet.display(), rows)),
            Err(e) => {
                error!("Spreadsheet export failed: {:#}", e);
                notes.push(format!("Error saving spreadsheet: {:#}", e));
            }
        }

        match ProductStore::open(database).and_then(|mut store| store.insert_products(records)) {
            Ok(rows) => notes.push(format!("Database updated: {} ({} rows)", database.display(), rows)),
            Err(e) => {
                error!("Database insert failed: {:#}", e);
                notes.push(format!("Error inserting into database: {:#}", e));
            }
        }

        notes
    }
}
