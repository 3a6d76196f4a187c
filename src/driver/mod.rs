//! Page interaction capability used by the scraper.
//!
//! The scraper never talks to a browser directly. Everything goes through
//! [`PageDriver`], which is backed either by a live WebDriver session or by
//! captured HTML screens replayed offline.

pub mod static_site;

#[cfg(feature = "webdriver")]
pub mod webdriver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub use static_site::StaticSite;

#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverSession;

/// Default interval between lookups while waiting on a condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How an element is located on the page.
///
/// Written in config files as `class:<name>`, `id:<id>` or `css:<selector>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    /// A single CSS class name.
    Class(String),
    /// An exact element id.
    Id(String),
    /// Any CSS selector (used for id-substring matches like `[id*=foo]`).
    Css(String),
}

impl Locator {
    pub fn class(name: impl Into<String>) -> Self {
        Locator::Class(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Returns the equivalent CSS selector.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Class(name) => format!(".{}", name),
            Locator::Id(id) => format!("[id=\"{}\"]", id),
            Locator::Css(selector) => selector.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Class(name) => write!(f, "class:{}", name),
            Locator::Id(id) => write!(f, "id:{}", id),
            Locator::Css(selector) => write!(f, "css:{}", selector),
        }
    }
}

impl FromStr for Locator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid locator: {}. Use class:, id: or css: prefix", s))?;

        let value = value.trim();
        if value.is_empty() {
            return Err(format!("Empty locator value in: {}", s));
        }

        match kind.trim().to_lowercase().as_str() {
            "class" => Ok(Locator::Class(value.to_string())),
            "id" => Ok(Locator::Id(value.to_string())),
            "css" => Ok(Locator::Css(value.to_string())),
            other => Err(format!("Unknown locator kind: {}. Use class, id or css", other)),
        }
    }
}

impl TryFrom<String> for Locator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

/// Condition an element must satisfy before a wait resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The element exists in the document.
    Present,
    /// The element exists, is displayed and is enabled.
    Clickable,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Present => write!(f, "present"),
            Condition::Clickable => write!(f, "clickable"),
        }
    }
}

/// Errors raised by a [`PageDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NotFound(Locator),

    #[error("timed out after {timeout:?} waiting for {locator} to be {condition}")]
    Timeout { locator: Locator, condition: Condition, timeout: Duration },

    #[error("element is not interactable: {0}")]
    NotInteractable(String),

    #[error("invalid locator {locator}: {reason}")]
    InvalidLocator { locator: Locator, reason: String },

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("driver session error: {0}")]
    Session(String),
}

impl DriverError {
    /// True when the error only means "the element is not there (yet)".
    pub fn is_absence(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::Timeout { .. })
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Narrow interface over a rendered page - enables offline replay and mocking for tests.
///
/// All lookups take an optional `scope`; `None` searches the whole document.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opaque handle to an element on the current page.
    type Element: Send + Sync;

    /// Navigates to the given location.
    async fn goto(&self, url: &str) -> DriverResult<()>;

    /// Finds the first element matching `locator`, failing with [`DriverError::NotFound`].
    async fn find(
        &self,
        scope: Option<&Self::Element>,
        locator: &Locator,
    ) -> DriverResult<Self::Element>;

    /// Finds every element matching `locator`, in document order.
    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        locator: &Locator,
    ) -> DriverResult<Vec<Self::Element>>;

    /// Returns the visible text of an element.
    async fn text(&self, element: &Self::Element) -> DriverResult<String>;

    /// Types text into an element.
    async fn send_keys(&self, element: &Self::Element, text: &str) -> DriverResult<()>;

    /// Performs a regular click.
    async fn click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Activates an element through script, ignoring overlays that would intercept a click.
    async fn force_click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Returns true if the element is displayed and enabled.
    async fn is_clickable(&self, element: &Self::Element) -> DriverResult<bool>;

    /// Interval between lookups in [`PageDriver::wait_for`].
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Polls until an element matching `locator` satisfies `condition`.
    ///
    /// Looks at least once, even with a zero timeout. Absence keeps polling;
    /// any other driver error is returned immediately.
    async fn wait_for(
        &self,
        locator: &Locator,
        condition: Condition,
        timeout: Duration,
    ) -> DriverResult<Self::Element> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.find(None, locator).await {
                Ok(element) => {
                    let ready = match condition {
                        Condition::Present => true,
                        Condition::Clickable => self.is_clickable(&element).await?,
                    };
                    if ready {
                        return Ok(element);
                    }
                }
                Err(DriverError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::Timeout { locator: locator.clone(), condition, timeout });
            }

            tokio::time::sleep(self.poll_interval().min(deadline - now)).await;
        }
    }
}
