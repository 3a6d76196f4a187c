//! Paginated extraction engine.
//!
//! Drives a [`PageDriver`] through search, per-page extraction and
//! next-page detection until the results run out.

use crate::config::Config;
use crate::driver::{Condition, DriverResult, Locator, PageDriver};
use crate::falabella::models::{Harvest, Record, ScrapeReport, StopReason};
use crate::falabella::selectors::SiteSelectors;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of looking for the next-page control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageProbe {
    /// The control is present and actionable.
    MorePages,
    /// The control did not become actionable before the timeout.
    NoMorePages,
    /// The driver failed while looking.
    ProbeFailed,
}

/// Tunables for a [`Scraper`].
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Landing page that holds the search box
    pub url: String,
    /// Bound for every wait
    pub timeout: Duration,
    /// Pause after activating the next-page control
    pub settle: Duration,
    /// Maximum pages per run (0 = unlimited)
    pub max_pages: u32,
    /// Retry policy for failed next-page probes
    pub retry: RetryPolicy,
    /// Element lookups
    pub selectors: SiteSelectors,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ScraperSettings {
    fn from(config: &Config) -> Self {
        Self {
            url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
            max_pages: config.max_pages,
            retry: config.retry.clone(),
            selectors: config.selectors.clone(),
        }
    }
}

/// Scraper for Falabella search results.
///
/// Borrows the driver for its whole lifetime; creating and closing the
/// browser session is the caller's job.
pub struct Scraper<'d, D: PageDriver> {
    driver: &'d D,
    settings: ScraperSettings,
    data: Vec<Record>,
}

impl<'d, D: PageDriver> Scraper<'d, D> {
    /// Creates a scraper over the given driver.
    pub fn new(driver: &'d D, settings: ScraperSettings) -> Self {
        debug!("Scraper initialized for {}", settings.url);
        Self { driver, settings, data: Vec::new() }
    }

    /// Opens the landing page and submits `query`.
    ///
    /// Returns true once the results container is present. Failures are
    /// logged and reported as false.
    pub async fn search(&self, query: &str) -> bool {
        match self.submit_search(query).await {
            Ok(()) => {
                info!("Search succeeded");
                true
            }
            Err(e) => {
                error!("Search failed: {}", e);
                false
            }
        }
    }

    async fn submit_search(&self, query: &str) -> DriverResult<()> {
        let selectors = &self.settings.selectors;

        info!("Navigating to {}", self.settings.url);
        self.driver.goto(&self.settings.url).await?;

        let input = self.wait_present(&selectors.search_input).await?;

        info!("Searching for: {}", query);
        self.driver.send_keys(&input, query).await?;

        let button = self.driver.find(None, &selectors.search_button).await?;
        self.driver.click(&button).await?;

        self.wait_present(&selectors.results).await?;
        Ok(())
    }

    async fn wait_present(&self, locator: &Locator) -> DriverResult<D::Element> {
        self.driver.wait_for(locator, Condition::Present, self.settings.timeout).await
    }

    /// Extracts every product card on the current page into the accumulator.
    ///
    /// Returns the number of records appended.
    pub async fn extract_current_page(&mut self) -> usize {
        let mut harvest = Harvest::new();
        let count = self.extract_into(&mut harvest).await;
        self.data.extend(harvest.into_records());
        count
    }

    async fn extract_into(&self, harvest: &mut Harvest) -> usize {
        let entries = match self.product_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to extract products: {}", e);
                harvest.push_page(Vec::new());
                return 0;
            }
        };

        let mut page = Vec::with_capacity(entries.len());
        for entry in &entries {
            page.push(self.read_record(entry).await);
        }

        let count = page.len();
        info!("{} products extracted from this page", count);

        harvest.push_page(page);
        count
    }

    async fn product_entries(&self) -> DriverResult<Vec<D::Element>> {
        let selectors = &self.settings.selectors;

        let container = self.wait_present(&selectors.results).await?;
        self.driver.find_all(Some(&container), &selectors.product).await
    }

    async fn read_record(&self, entry: &D::Element) -> Record {
        let selectors = &self.settings.selectors;

        Record {
            vendor: self.read_field(entry, &selectors.vendor).await,
            seller: self.read_field(entry, &selectors.seller).await,
            name: self.read_field(entry, &selectors.name).await,
            sale_price: self.read_field(entry, &selectors.sale_price).await,
            list_price: self.read_field(entry, &selectors.list_price).await,
        }
    }

    /// Reads one field of a card, or "" if it cannot be read.
    async fn read_field(&self, entry: &D::Element, locator: &Locator) -> String {
        let text = match self.driver.find(Some(entry), locator).await {
            Ok(element) => self.driver.text(&element).await,
            Err(e) => Err(e),
        };

        text.unwrap_or_else(|e| {
            debug!("Field {} unavailable: {}", locator, e);
            String::new()
        })
    }

    /// Looks for an actionable next-page control, separating absence from failure.
    pub async fn probe_next_page(&self) -> PageProbe {
        let locator = &self.settings.selectors.next_page;

        match self.driver.wait_for(locator, Condition::Clickable, self.settings.timeout).await {
            Ok(_) => PageProbe::MorePages,
            Err(e) if e.is_absence() => {
                debug!("Next-page control not actionable: {}", e);
                PageProbe::NoMorePages
            }
            Err(e) => {
                warn!("Next-page probe failed: {}", e);
                PageProbe::ProbeFailed
            }
        }
    }

    /// Returns true if an actionable next-page control exists.
    pub async fn has_next_page(&self) -> bool {
        self.probe_next_page().await == PageProbe::MorePages
    }

    async fn probe_with_retry(&self) -> PageProbe {
        let retry = &self.settings.retry;
        let mut attempt = 1;

        loop {
            let probe = self.probe_next_page().await;
            if probe != PageProbe::ProbeFailed || !retry.should_retry(attempt) {
                return probe;
            }

            retry.wait(attempt).await;
            attempt += 1;
        }
    }

    /// Activates the next-page control and waits for the page to settle.
    ///
    /// Assumes [`Scraper::has_next_page`] already returned true.
    pub async fn go_to_next_page(&self) -> bool {
        match self.advance().await {
            Ok(()) => {
                info!("Moved to next page");
                true
            }
            Err(e) => {
                error!("Could not go to the next page: {}", e);
                false
            }
        }
    }

    async fn advance(&self) -> DriverResult<()> {
        let locator = &self.settings.selectors.next_page;

        let control = self.driver.wait_for(locator, Condition::Clickable, self.settings.timeout).await?;
        self.driver.force_click(&control).await?;

        if !self.settings.settle.is_zero() {
            tokio::time::sleep(self.settings.settle).await;
        }

        Ok(())
    }

    /// Runs a full search-and-paginate pass into a fresh result set.
    ///
    /// Leaves the accumulator untouched.
    pub async fn run(&self, query: &str) -> ScrapeReport {
        let mut harvest = Harvest::new();

        if !self.search(query).await {
            error!("Could not perform the search");
            return harvest.finish(query, StopReason::SearchFailed);
        }

        let mut page: u32 = 1;

        let stop = loop {
            info!("Processing page {}", page);
            self.extract_into(&mut harvest).await;

            if let Some(stop) = self.turn_page(page).await {
                break stop;
            }
            page += 1;
        };

        info!("Scraping complete: {} products found ({})", harvest.len(), stop);
        harvest.finish(query, stop)
    }

    /// Moves past `page`, or returns why pagination ends there.
    async fn turn_page(&self, page: u32) -> Option<StopReason> {
        match self.probe_with_retry().await {
            PageProbe::MorePages if self.page_limit_reached(page) => {
                warn!("Stopping at page limit ({} pages)", self.settings.max_pages);
                return Some(StopReason::PageLimit);
            }
            PageProbe::MorePages => {}
            PageProbe::NoMorePages => {
                info!("No more pages");
                return Some(StopReason::NoMorePages);
            }
            PageProbe::ProbeFailed => {
                error!("Giving up on pagination after {} attempt(s)", self.settings.retry.max_attempts.max(1));
                return Some(StopReason::ProbeFailed);
            }
        }

        if !self.go_to_next_page().await {
            return Some(StopReason::PagerFailed);
        }
        None
    }

    fn page_limit_reached(&self, page: u32) -> bool {
        self.settings.max_pages > 0 && page >= self.settings.max_pages
    }

    /// Scrapes every page for `query` and returns all accumulated records.
    ///
    /// Each page lands in the accumulator as soon as it is extracted, so
    /// dropping the future between pages keeps what was already read.
    /// Records pile up across calls until [`Scraper::clear_data`]. A failed
    /// search returns an empty slice.
    pub async fn scrape_all_pages(&mut self, query: &str) -> &[Record] {
        if !self.search(query).await {
            error!("Could not perform the search");
            return &[];
        }

        let start = self.data.len();
        let mut page: u32 = 1;

        let stop = loop {
            info!("Processing page {}", page);
            self.extract_current_page().await;

            if let Some(stop) = self.turn_page(page).await {
                break stop;
            }
            page += 1;
        };

        info!("Scraping complete: {} products found ({})", self.data.len() - start, stop);
        &self.data
    }

    /// Records accumulated so far.
    pub fn get_data(&self) -> &[Record] {
        &self.data
    }

    /// Empties the accumulator.
    pub fn clear_data(&mut self) {
        self.data.clear();
        info!("Collected data cleared");
    }
}
