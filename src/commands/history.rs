//! Read-only commands over the product database.

use crate::config::{Config, OutputFormat};
use crate::export::ProductStore;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Lists stored tables and products.
pub struct HistoryCommand {
    config: Config,
}

impl HistoryCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Opens the database read-only; `None` if it was never created.
    fn open_store(&self) -> Result<Option<ProductStore>> {
        let path = &self.config.output.database;
        ProductStore::open_read_only(path)
            .with_context(|| format!("Failed to open product database: {}", path.display()))
    }

    /// Lists tables whose name contains `SAGA`.
    pub fn tables(&self) -> Result<String> {
        let tables = match self.open_store()? {
            Some(store) => store.list_tables()?,
            None => Vec::new(),
        };
        info!("{} tables found", tables.len());

        Ok(match self.config.format {
            OutputFormat::Json => serde_json::to_string_pretty(&tables)?,
            _ if tables.is_empty() => "No tables found.".to_string(),
            _ => tables.join("\n"),
        })
    }

    /// Shows stored products, newest import first.
    pub fn history(&self, limit: Option<usize>) -> Result<String> {
        let products = match self.open_store()? {
            Some(store) if store.has_products_table()? => store.recent(limit)?,
            _ => Vec::new(),
        };
        info!("{} products read", products.len());

        Ok(Formatter::new(self.config.format).format_stored(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::falabella::Record;
    use std::path::Path;
    use tempfile::tempdir;

    fn make_test_config(dir: &Path, format: OutputFormat) -> Config {
        let mut config = Config::default();
        config.format = format;
        config.output.database = dir.join("productos.db");
        config
    }

    fn seed(config: &Config) {
        let mut store = ProductStore::open(&config.output.database).unwrap();
        store
            .insert_products(&[
                Record::new("Samsung", "Por Falabella", "Smart TV 55", "S/ 1,599", "S/ 2,199"),
                Record::new("LG", "", "Monitor 27", "S/ 499", ""),
            ])
            .unwrap();
    }

    #[test]
    fn test_tables_lists_products_table() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Table);
        seed(&config);

        assert_eq!(HistoryCommand::new(config).tables().unwrap(), "productos_saga");
    }

    #[test]
    fn test_tables_json() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Json);
        seed(&config);

        let tables: Vec<String> = serde_json::from_str(&HistoryCommand::new(config).tables().unwrap()).unwrap();
        assert_eq!(tables, vec!["productos_saga".to_string()]);
    }

    #[test]
    fn test_tables_missing_database() {
        let dir = tempdir().unwrap();
        let mut config = make_test_config(dir.path(), OutputFormat::Table);
        config.output.database = dir.path().join("data").join("productos.db");
        let cmd = HistoryCommand::new(config.clone());

        assert_eq!(cmd.tables().unwrap(), "No tables found.");
        assert!(!config.output.database.exists());
        assert!(!dir.path().join("data").exists());

        let json = HistoryCommand::new(Config { format: OutputFormat::Json, ..config }).tables().unwrap();
        assert_eq!(serde_json::from_str::<Vec<String>>(&json).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_history_empty_database() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Table);
        let cmd = HistoryCommand::new(config.clone());

        assert_eq!(cmd.history(None).unwrap(), "No products found.");
        assert!(!config.output.database.exists());
    }

    #[test]
    fn test_history_database_without_products_table() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Table);
        rusqlite::Connection::open(&config.output.database)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER);")
            .unwrap();

        let cmd = HistoryCommand::new(config);
        assert_eq!(cmd.history(None).unwrap(), "No products found.");
        assert_eq!(cmd.tables().unwrap(), "No tables found.");
    }

    #[test]
    fn test_history_shows_products() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Markdown);
        seed(&config);

        let output = HistoryCommand::new(config).history(None).unwrap();
        assert!(output.contains("| Samsung | Por Falabella | Smart TV 55 | S/ 1,599 | S/ 2,199 |"));
        assert!(output.contains("*2 products found*"));
        assert!(output.contains("Last import:"));
    }

    #[test]
    fn test_history_limit() {
        let dir = tempdir().unwrap();
        let config = make_test_config(dir.path(), OutputFormat::Csv);
        seed(&config);

        let output = HistoryCommand::new(config).history(Some(1)).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("Samsung"));
    }

    #[test]
    fn test_history_unopenable_database() {
        let dir = tempdir().unwrap();
        let mut config = make_test_config(dir.path(), OutputFormat::Table);
        config.output.database = dir.path().to_path_buf();

        let err = HistoryCommand::new(config).history(None).unwrap_err();
        assert!(err.to_string().contains("Failed to open product database"));
    }
}
