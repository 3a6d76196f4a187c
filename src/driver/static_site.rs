//! Offline [`PageDriver`] over captured HTML screens.
//!
//! Screen 0 is the landing page that [`PageDriver::goto`] opens. Navigation
//! between screens is declared in the HTML itself:
//!
//! - `data-goto="N"`: activating the element switches to screen `N`
//! - `data-broken`: activating the element fails with a script error
//! - `disabled`, `hidden` or `aria-disabled="true"`: the element is not clickable
//!
//! **Capture process**: save the rendered HTML of each page, add `data-goto`
//! to the controls that lead to the next screen, then replay.

use super::{DriverError, DriverResult, Locator, PageDriver, DEFAULT_POLL_INTERVAL};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// Matches every element; ordinals index into this document-order walk.
static ANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").unwrap());

/// Handle to an element of one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteElement {
    screen: usize,
    ordinal: usize,
}

#[derive(Debug, Default)]
struct SiteState {
    current: Option<usize>,
    visited: Vec<String>,
    typed: Vec<String>,
    lookups: Vec<Locator>,
    faults: usize,
    activations: usize,
}

/// A fixed set of HTML screens that behaves like a small website.
pub struct StaticSite {
    screens: Vec<String>,
    state: Mutex<SiteState>,
    poll_interval: Duration,
}

impl StaticSite {
    /// Creates a site from in-memory HTML screens.
    pub fn new(screens: Vec<String>) -> Self {
        Self { screens, state: Mutex::new(SiteState::default()), poll_interval: DEFAULT_POLL_INTERVAL }
    }

    /// Loads screens from HTML files, in the given order.
    pub fn from_files(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut screens = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            debug!("Loading screen {} from: {}", screens.len(), path.display());
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read HTML screen: {}", path.display()))?;
            screens.push(html);
        }

        if screens.is_empty() {
            anyhow::bail!("At least one HTML screen is required");
        }

        Ok(Self::new(screens))
    }

    /// Sets the polling interval used while waiting on conditions.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Makes the next `count` lookups fail with a session error.
    pub fn inject_faults(&self, count: usize) {
        self.state().faults += count;
    }

    /// Index of the screen currently shown, if any page was opened.
    pub fn current_screen(&self) -> Option<usize> {
        self.state().current
    }

    /// Every URL passed to `goto`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.state().visited.clone()
    }

    /// Every text typed with `send_keys`, in order.
    pub fn typed(&self) -> Vec<String> {
        self.state().typed.clone()
    }

    /// How many lookups used the given locator.
    pub fn lookup_count(&self, locator: &Locator) -> usize {
        self.state().lookups.iter().filter(|l| *l == locator).count()
    }

    /// Number of successful element activations.
    pub fn activations(&self) -> usize {
        self.state().activations
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select(
        &self,
        scope: Option<&SiteElement>,
        locator: &Locator,
    ) -> DriverResult<Vec<SiteElement>> {
        let screen = {
            let mut state = self.state();
            state.lookups.push(locator.clone());

            if state.faults > 0 {
                state.faults -= 1;
                return Err(DriverError::Session(format!("injected fault while looking up {}", locator)));
            }

            state.current.ok_or_else(|| DriverError::Session("no page loaded".to_string()))?
        };

        let selector = Selector::parse(&locator.to_css()).map_err(|e| {
            DriverError::InvalidLocator { locator: locator.clone(), reason: e.to_string() }
        })?;

        let document = Html::parse_document(&self.screens[screen]);

        let ordinals: Vec<usize> = match scope {
            Some(scope) => {
                if scope.screen != screen {
                    return Err(stale());
                }
                let root = resolve(&document, scope)?;
                root.select(&selector)
                    .filter(|e| e.id() != root.id())
                    .filter_map(|e| ordinal_of(&document, e))
                    .collect()
            }
            None => document.select(&selector).filter_map(|e| ordinal_of(&document, e)).collect(),
        };

        trace!("{} matched {} element(s) on screen {}", locator, ordinals.len(), screen);

        Ok(ordinals.into_iter().map(|ordinal| SiteElement { screen, ordinal }).collect())
    }

    fn with_element<T>(
        &self,
        element: &SiteElement,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> DriverResult<T> {
        if self.state().current != Some(element.screen) {
            return Err(stale());
        }

        let document = Html::parse_document(&self.screens[element.screen]);
        let node = resolve(&document, element)?;
        Ok(f(node))
    }

    fn activate(&self, element: &SiteElement) -> DriverResult<()> {
        let (broken, target) = self.with_element(element, |e| {
            (e.value().attr("data-broken").is_some(), e.value().attr("data-goto").map(str::to_string))
        })?;

        if broken {
            return Err(DriverError::Script("click handler raised an error".to_string()));
        }

        let mut state = self.state();
        state.activations += 1;

        if let Some(target) = target {
            let index: usize = target
                .trim()
                .parse()
                .map_err(|_| DriverError::Script(format!("invalid data-goto target: {}", target)))?;

            if index >= self.screens.len() {
                return Err(DriverError::Session(format!("screen {} does not exist", index)));
            }

            debug!("Switching to screen {}", index);
            state.current = Some(index);
        }

        Ok(())
    }
}

fn stale() -> DriverError {
    DriverError::Session("stale element reference".to_string())
}

fn resolve<'a>(document: &'a Html, element: &SiteElement) -> DriverResult<ElementRef<'a>> {
    document.select(&ANY).nth(element.ordinal).ok_or_else(stale)
}

fn ordinal_of(document: &Html, element: ElementRef<'_>) -> Option<usize> {
    document.select(&ANY).position(|e| e.id() == element.id())
}

fn clickable(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_none()
        && value.attr("hidden").is_none()
        && value.attr("aria-disabled") != Some("true")
}

#[async_trait]
impl PageDriver for StaticSite {
    type Element = SiteElement;

    async fn goto(&self, url: &str) -> DriverResult<()> {
        if self.screens.is_empty() {
            return Err(DriverError::Session("site has no screens".to_string()));
        }

        debug!("GET {}", url);
        let mut state = self.state();
        state.visited.push(url.to_string());
        state.current = Some(0);
        Ok(())
    }

    async fn find(
        &self,
        scope: Option<&SiteElement>,
        locator: &Locator,
    ) -> DriverResult<SiteElement> {
        self.select(scope, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(locator.clone()))
    }

    async fn find_all(
        &self,
        scope: Option<&SiteElement>,
        locator: &Locator,
    ) -> DriverResult<Vec<SiteElement>> {
        self.select(scope, locator)
    }

    async fn text(&self, element: &SiteElement) -> DriverResult<String> {
        // Collapse whitespace the way a browser renders text
        self.with_element(element, |e| {
            e.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
        })
    }

    async fn send_keys(&self, element: &SiteElement, text: &str) -> DriverResult<()> {
        if !self.with_element(element, clickable)? {
            return Err(DriverError::NotInteractable("input is disabled".to_string()));
        }

        self.state().typed.push(text.to_string());
        Ok(())
    }

    async fn click(&self, element: &SiteElement) -> DriverResult<()> {
        if !self.with_element(element, clickable)? {
            return Err(DriverError::NotInteractable("element is disabled or hidden".to_string()));
        }

        self.activate(element)
    }

    async fn force_click(&self, element: &SiteElement) -> DriverResult<()> {
        self.activate(element)
    }

    async fn is_clickable(&self, element: &SiteElement) -> DriverResult<bool> {
        self.with_element(element, clickable)
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
