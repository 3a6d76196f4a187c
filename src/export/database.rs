//! SQLite storage for scraped products.

use crate::falabella::Record;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info};

/// Name of the products table.
pub const PRODUCTS_TABLE: &str = "productos_saga";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS productos_saga (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        proveedor TEXT NOT NULL,
        distribuidor TEXT NOT NULL,
        producto TEXT NOT NULL,
        precio_oferta TEXT NOT NULL,
        precio_normal TEXT NOT NULL,
        import_time TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_productos_saga_import_time
        ON productos_saga(import_time DESC);
"#;

/// A product row read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProduct {
    pub id: i64,
    pub record: Record,
    /// Shared by every row of the same insert batch
    pub import_time: DateTime<Utc>,
}

/// SQLite-backed product store.
pub struct ProductStore {
    conn: Connection,
}

impl ProductStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        debug!("Opening database: {}", path.display());
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Opens an existing database without creating or changing anything.
    ///
    /// Returns `None` when there is no file at `path`.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No database at {}", path.display());
            return Ok(None);
        }
        if !path.is_file() {
            bail!("Not a database file: {}", path.display());
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Some(Self { conn }))
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed to initialise schema")?;
        Ok(Self { conn })
    }

    /// Inserts all records in one transaction, stamped with a single import time.
    ///
    /// Nothing is written if any row fails. Returns the number of rows inserted.
    pub fn insert_products(&mut self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // Fixed-width UTC text so ORDER BY sorts chronologically
        let import_time = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO productos_saga (
                    proveedor, distribuidor, producto, precio_oferta, precio_normal, import_time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.vendor,
                    record.seller,
                    record.name,
                    record.sale_price,
                    record.list_price,
                    import_time,
                ])
                .context("Failed to insert product")?;
            }
        }
        tx.commit().context("Failed to commit products")?;

        info!("{} products inserted into {}", records.len(), PRODUCTS_TABLE);
        Ok(records.len())
    }

    /// Stored products, newest import first; rows of one batch keep their order.
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<StoredProduct>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = self.conn.prepare(
            "SELECT id, proveedor, distribuidor, producto, precio_oferta, precio_normal, import_time
             FROM productos_saga
             ORDER BY import_time DESC, id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            let import_time: String = row.get(6)?;
            Ok(StoredProduct {
                id: row.get(0)?,
                record: Record::new(
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ),
                import_time: parse_datetime(&import_time),
            })
        })?;

        let products = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("{} products read from {}", products.len(), PRODUCTS_TABLE);
        Ok(products)
    }

    /// Total rows in the products table.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM productos_saga", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns true if the products table exists.
    pub fn has_products_table(&self) -> Result<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![PRODUCTS_TABLE],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    /// Tables whose name contains `SAGA` (case-insensitive).
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name LIKE '%SAGA%'
             ORDER BY name",
        )?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("{} tables found", tables.len());
        Ok(tables)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
