//! Live [`PageDriver`] backed by a W3C WebDriver session (chromedriver).

use super::{DriverError, DriverResult, Locator, PageDriver};
use crate::config::BrowserConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, info};

/// Chrome arguments applied to every session.
const BASE_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--start-maximized",
    "--remote-allow-origins=*",
];

/// Script used for forced activation.
const FORCE_CLICK_SCRIPT: &str = "arguments[0].click();";

/// Chrome session driven through a WebDriver server.
pub struct WebDriverSession {
    driver: WebDriver,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Starts a new Chrome session on the configured WebDriver server.
    pub async fn connect(config: &BrowserConfig, poll_interval: Duration) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();

        for arg in chrome_args(config) {
            caps.add_arg(&arg).with_context(|| format!("Invalid Chrome argument: {}", arg))?;
        }

        info!("Starting browser session via {}", config.webdriver_url);
        let driver = WebDriver::new(config.webdriver_url.as_str(), caps)
            .await
            .with_context(|| {
                format!("Failed to connect to WebDriver server at {}", config.webdriver_url)
            })?;

        Ok(Self { driver, poll_interval })
    }

    /// Ends the session and closes the browser.
    pub async fn quit(self) -> Result<()> {
        debug!("Quitting browser session");
        self.driver.quit().await.context("Failed to close browser session")
    }
}

/// Builds the full Chrome argument list for a session.
fn chrome_args(config: &BrowserConfig) -> Vec<String> {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|a| a.to_string()).collect();

    if config.headless {
        args.push("--headless".to_string());
    }

    args.extend(config.extra_args.iter().cloned());
    args
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Class(name) => By::ClassName(name.clone()),
        Locator::Id(id) => By::Id(id.clone()),
        Locator::Css(selector) => By::Css(selector.clone()),
    }
}

fn session_error(e: WebDriverError) -> DriverError {
    DriverError::Session(e.to_string())
}

#[async_trait]
impl PageDriver for WebDriverSession {
    type Element = WebElement;

    async fn goto(&self, url: &str) -> DriverResult<()> {
        debug!("GET {}", url);
        self.driver.goto(url).await.map_err(session_error)
    }

    async fn find(&self, scope: Option<&WebElement>, locator: &Locator) -> DriverResult<WebElement> {
        // find_all reports absence as an empty list, so no error-kind matching is needed
        self.find_all(scope, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(locator.clone()))
    }

    async fn find_all(
        &self,
        scope: Option<&WebElement>,
        locator: &Locator,
    ) -> DriverResult<Vec<WebElement>> {
        let result = match scope {
            Some(element) => element.find_all(by(locator)).await,
            None => self.driver.find_all(by(locator)).await,
        };

        result.map_err(session_error)
    }

    async fn text(&self, element: &WebElement) -> DriverResult<String> {
        element.text().await.map_err(session_error)
    }

    async fn send_keys(&self, element: &WebElement, text: &str) -> DriverResult<()> {
        element
            .send_keys(text)
            .await
            .map_err(|e| DriverError::NotInteractable(e.to_string()))
    }

    async fn click(&self, element: &WebElement) -> DriverResult<()> {
        element.click().await.map_err(|e| DriverError::NotInteractable(e.to_string()))
    }

    async fn force_click(&self, element: &WebElement) -> DriverResult<()> {
        let arg = element.to_json().map_err(|e| DriverError::Script(e.to_string()))?;

        self.driver
            .execute(FORCE_CLICK_SCRIPT, vec![arg])
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn is_clickable(&self, element: &WebElement) -> DriverResult<bool> {
        let displayed = element.is_displayed().await.map_err(session_error)?;
        if !displayed {
            return Ok(false);
        }

        element.is_enabled().await.map_err(session_error)
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
