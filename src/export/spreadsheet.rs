//! Spreadsheet (CSV) export of scraped records.

use crate::falabella::Record;
use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::info;

/// Writes a header row plus one row per record.
///
/// The header is always written, so an empty slice yields a header-only sheet.
pub fn write_records<W: io::Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(Record::HEADERS)?;

    for record in records {
        wtr.write_record(record.fields())?;
    }

    wtr.flush()?;
    Ok(())
}

/// Renders records as CSV text.
pub fn to_string(records: &[Record]) -> Result<String> {
    let mut buf = Vec::new();
    write_records(&mut buf, records)?;
    String::from_utf8(buf).context("CSV output was not valid UTF-8")
}

/// Saves records to `path`, replacing any existing file.
///
/// Parent directories are created as needed. Returns the number of rows written.
pub fn save(path: impl AsRef<Path>, records: &[Record]) -> Result<usize> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create spreadsheet: {}", path.display()))?;
    write_records(io::BufWriter::new(file), records)
        .with_context(|| format!("Failed to write spreadsheet: {}", path.display()))?;

    info!("Saved {} records to {}", records.len(), path.display());
    Ok(records.len())
}

/// Loads records back from a spreadsheet written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;

    rdr.deserialize()
        .collect::<Result<Vec<Record>, _>>()
        .with_context(|| format!("Failed to read spreadsheet: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_records() -> Vec<Record> {
        vec![
            Record::new("Samsung", "Por Falabella", "Smart TV 55\" UHD", "S/ 1,599", "S/ 2,199"),
            Record::new("LG", "", "Monitor 27", "S/ 499", ""),
        ]
    }

    #[test]
    fn test_header_only_when_empty() {
        let out = to_string(&[]).unwrap();
        assert_eq!(out, "Proveedor,Distribuidor,Producto,Precio Oferta,Precio Normal\n");
    }

    #[test]
    fn test_rows_follow_record_order() {
        let out = to_string(&make_records()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Samsung,Por Falabella,\"Smart TV 55\"\" UHD\",\"S/ 1,599\",\"S/ 2,199\"");
        assert_eq!(lines[2], "LG,,Monitor 27,S/ 499,");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("productos.csv");

        let written = save(&path, &make_records()).unwrap();
        assert_eq!(written, 2);
        assert!(path.exists());

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, make_records());
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        save(&path, &make_records()).unwrap();
        save(&path, &make_records()[..1]).unwrap();

        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load("/nonexistent/productos.csv").unwrap_err().to_string();
        assert!(err.contains("Failed to open spreadsheet"));
    }
}
