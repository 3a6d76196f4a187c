//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::falabella::selectors::SiteSelectors;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Landing page with the search box
    #[serde(default = "default_url")]
    pub url: String,

    /// Timeout for every wait, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between lookups while waiting, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after moving to the next page, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Maximum pages per search (0 = unlimited)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Browser session settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Retry policy for the next-page check
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Element locators
    #[serde(default)]
    pub selectors: SiteSelectors,

    /// Export and log destinations
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_url() -> String {
    "https://www.falabella.com.pe/falabella-pe".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_max_pages() -> u32 {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
            max_pages: default_max_pages(),
            format: OutputFormat::Table,
            browser: BrowserConfig::default(),
            retry: RetryPolicy::default(),
            selectors: SiteSelectors::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("falabella-scraper").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("FALABELLA_URL") {
            self.url = url;
        }

        if let Ok(timeout) = std::env::var("FALABELLA_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        if let Ok(headless) = std::env::var("FALABELLA_HEADLESS") {
            if let Some(h) = parse_flag(&headless) {
                self.browser.headless = h;
            }
        }

        if let Ok(webdriver_url) = std::env::var("FALABELLA_WEBDRIVER_URL") {
            self.browser.webdriver_url = webdriver_url;
        }

        if let Ok(database) = std::env::var("FALABELLA_DATABASE") {
            self.output.database = PathBuf::from(database);
        }

        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// WebDriver / Chrome settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server URL (chromedriver listens on 9515 by default)
    pub webdriver_url: String,
    /// Run Chrome without a window
    pub headless: bool,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { webdriver_url: "http://localhost:9515".to_string(), headless: false, extra_args: Vec::new() }
    }
}

/// Where results and logs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Spreadsheet (CSV) file
    pub spreadsheet: PathBuf,
    /// SQLite database holding the products table
    pub database: PathBuf,
    /// Log file; logging goes to the console only when unset
    pub log_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            spreadsheet: PathBuf::from("data/productos.csv"),
            database: PathBuf::from("data/productos.db"),
            log_file: Some(PathBuf::from("logs/scraper.log")),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Locator;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.url, "https://www.falabella.com.pe/falabella-pe");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.settle_ms, 2000);
        assert_eq!(config.max_pages, 200);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
        assert_eq!(config.output.spreadsheet, PathBuf::from("data/productos.csv"));
        assert_eq!(config.output.database, PathBuf::from("data/productos.db"));
        assert_eq!(config.output.log_file, Some(PathBuf::from("logs/scraper.log")));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.selectors, SiteSelectors::default());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "xlsx".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
        assert!(err.contains("table, json, markdown, csv"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            timeout_secs = 20
            max_pages = 5

            [browser]
            headless = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.max_pages, 5);
        assert!(config.browser.headless);
        assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
        assert_eq!(config.settle_ms, 2000);
    }

    #[test]
    fn test_config_from_toml_all_sections() {
        let toml = r#"
            url = "https://www.falabella.com.co/falabella-co"
            timeout_secs = 15
            poll_interval_ms = 100
            settle_ms = 500
            max_pages = 0
            format = "json"

            [browser]
            webdriver_url = "http://chrome:4444"
            headless = true
            extra_args = ["--lang=es-PE"]

            [retry]
            max_attempts = 4
            initial_backoff_ms = 250

            [selectors]
            product = "css:div.pod"
            seller = "css:[id*=sellerText]"

            [output]
            spreadsheet = "out/items.csv"
            database = "out/items.db"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "https://www.falabella.com.co/falabella-co");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.settle_ms, 500);
        assert_eq!(config.max_pages, 0);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.browser.webdriver_url, "http://chrome:4444");
        assert_eq!(config.browser.extra_args, vec!["--lang=es-PE"]);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_backoff_ms, 250);
        assert_eq!(config.retry.multiplier, 2.0);
        assert_eq!(config.selectors.product, Locator::css("div.pod"));
        assert_eq!(config.selectors.seller, Locator::css("[id*=sellerText]"));
        assert_eq!(config.selectors.vendor, SiteSelectors::default().vendor);
        assert_eq!(config.output.spreadsheet, PathBuf::from("out/items.csv"));
        assert_eq!(config.output.database, PathBuf::from("out/items.db"));
        // Section present but key omitted keeps the default
        assert_eq!(config.output.log_file, Some(PathBuf::from("logs/scraper.log")));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../config.example.toml")).unwrap();
        let defaults = Config::default();

        assert_eq!(config.url, defaults.url);
        assert_eq!(config.timeout_secs, defaults.timeout_secs);
        assert_eq!(config.max_pages, defaults.max_pages);
        assert_eq!(config.browser, defaults.browser);
        assert_eq!(config.retry, defaults.retry);
        assert_eq!(config.selectors, defaults.selectors);
        assert_eq!(config.output, defaults.output);
    }

    #[test]
    fn test_config_rejects_bad_locator() {
        let toml = r#"
            [selectors]
            product = "div.pod"
        "#;

        let err = toml::from_str::<Config>(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid locator"));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            timeout_secs = 3
            settle_ms = 0
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.settle_ms, 0);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let result = Config::from_file(file.path());
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_pages = 30").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.max_pages, 30);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_config_with_env() {
        let vars = [
            "FALABELLA_URL",
            "FALABELLA_TIMEOUT",
            "FALABELLA_HEADLESS",
            "FALABELLA_WEBDRIVER_URL",
            "FALABELLA_DATABASE",
        ];
        let originals: Vec<_> = vars.iter().map(|v| std::env::var(v).ok()).collect();

        std::env::set_var("FALABELLA_URL", "https://example.test/landing");
        std::env::set_var("FALABELLA_TIMEOUT", "25");
        std::env::set_var("FALABELLA_HEADLESS", "true");
        std::env::set_var("FALABELLA_WEBDRIVER_URL", "http://grid:4444");
        std::env::set_var("FALABELLA_DATABASE", "/tmp/products.db");

        let config = Config::new().with_env();
        assert_eq!(config.url, "https://example.test/landing");
        assert_eq!(config.timeout_secs, 25);
        assert!(config.browser.headless);
        assert_eq!(config.browser.webdriver_url, "http://grid:4444");
        assert_eq!(config.output.database, PathBuf::from("/tmp/products.db"));

        // Invalid values are ignored, keeping defaults
        std::env::set_var("FALABELLA_TIMEOUT", "soon");
        std::env::set_var("FALABELLA_HEADLESS", "perhaps");

        let config = Config::new().with_env();
        assert_eq!(config.timeout_secs, 10);
        assert!(!config.browser.headless);

        // Restore original env vars
        for (var, original) in vars.iter().zip(originals) {
            match original {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.max_pages = 9;
        config.format = OutputFormat::Markdown;
        config.browser.headless = true;

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.max_pages, 9);
        assert_eq!(parsed.format, OutputFormat::Markdown);
        assert_eq!(parsed.browser, config.browser);
        assert_eq!(parsed.selectors, config.selectors);
        assert_eq!(parsed.output, config.output);
    }
}
