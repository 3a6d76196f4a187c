//! falabella-scraper - Paginated product scraper for Falabella search results
//!
//! Scrapes every result page for a product search and stores the listings
//! in a spreadsheet and a SQLite table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use falabella_scraper::commands::{HistoryCommand, SearchCommand, SearchOutcome};
use falabella_scraper::config::{Config, OutputFormat};
use falabella_scraper::driver::StaticSite;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "falabella-scraper",
    version,
    about = "Scrape product listings from Falabella search results",
    long_about = "Searches the Falabella storefront for a product, walks every result page, and saves vendor, seller, name and prices to a spreadsheet and a SQLite table."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (table, json, markdown, csv)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Timeout for every page wait, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Spreadsheet output path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a product and scrape every result page
    #[cfg(feature = "webdriver")]
    #[command(alias = "s")]
    Search {
        /// Product to search for (prompted when omitted)
        query: Option<String>,

        /// Run Chrome without a window
        #[arg(long)]
        headless: bool,

        /// WebDriver server URL
        #[arg(long, env = "FALABELLA_WEBDRIVER_URL")]
        webdriver_url: Option<String>,

        /// Maximum pages to scrape (0 = unlimited)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Print results without saving them
        #[arg(long)]
        no_export: bool,
    },

    /// Run the scraper against captured HTML screens
    Replay {
        /// HTML files; the first is the landing page
        #[arg(required = true)]
        screens: Vec<PathBuf>,

        /// Query typed into the search box
        #[arg(short, long, default_value = "replay")]
        query: String,

        /// Maximum pages to scrape (0 = unlimited)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Print results without saving them
        #[arg(long)]
        no_export: bool,
    },

    /// List product tables in the database
    Tables,

    /// Show stored products, newest first
    History {
        /// Maximum number of products to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(output) = cli.output {
        config.output.spreadsheet = output;
    }
    if let Some(database) = cli.database {
        config.output.database = database;
    }

    init_logging(cli.verbose, config.output.log_file.as_deref())?;

    match cli.command {
        #[cfg(feature = "webdriver")]
        Commands::Search { query, headless, webdriver_url, max_pages, no_export } => {
            let query = match query {
                Some(q) => q,
                None => prompt("Enter the product to scrape: ")?,
            };

            if query.trim().is_empty() {
                println!("A product name is required");
                return Ok(());
            }

            if headless {
                config.browser.headless = true;
            }
            if let Some(url) = webdriver_url {
                config.browser.webdriver_url = url;
            }
            if let Some(max) = max_pages {
                config.max_pages = max;
            }

            let mut cmd = SearchCommand::new(config);
            if no_export {
                cmd = cmd.without_export();
            }

            let outcome = cmd.execute(&query).await?;
            print_outcome(&outcome);
        }

        Commands::Replay { screens, query, max_pages, no_export } => {
            // Captured screens switch instantly
            config.settle_ms = 0;
            if let Some(max) = max_pages {
                config.max_pages = max;
            }

            let site = StaticSite::from_files(&screens)?
                .with_poll_interval(Duration::from_millis(config.poll_interval_ms.max(1)));

            let mut cmd = SearchCommand::new(config);
            if no_export {
                cmd = cmd.without_export();
            }

            let outcome = cmd.execute_with_driver(&site, &query).await?;
            print_outcome(&outcome);
        }

        Commands::Tables => {
            let output = HistoryCommand::new(config).tables()?;
            println!("{}", output);
        }

        Commands::History { limit } => {
            let output = HistoryCommand::new(config).history(limit)?;
            println!("{}", output);
        }
    }

    Ok(())
}

/// Console logging on stderr, plus an optional plain-text log file.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(feature = "webdriver")]
fn prompt(message: &str) -> Result<String> {
    use std::io::{BufRead, Write};

    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).context("Failed to read product name")?;
    Ok(line.trim().to_string())
}

fn print_outcome(outcome: &SearchOutcome) {
    println!("{}", outcome.output);

    for note in &outcome.notes {
        eprintln!("{}", note);
    }

    info!(
        "Finished \"{}\": {} products, {} page(s), {}",
        outcome.report.query,
        outcome.report.count(),
        outcome.report.pages_visited(),
        outcome.report.stop
    );
}
