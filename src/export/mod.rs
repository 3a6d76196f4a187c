//! Persistence of scraped records: spreadsheet file and SQLite table.

pub mod database;
pub mod spreadsheet;

pub use database::{ProductStore, StoredProduct, PRODUCTS_TABLE};
