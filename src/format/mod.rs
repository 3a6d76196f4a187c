//! Output formatting for records (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::export::{spreadsheet, StoredProduct};
use crate::falabella::Record;

/// Formats records for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats scraped records.
    pub fn format_records(&self, records: &[Record]) -> String {
        if records.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Record::HEADERS.join(","),
                _ => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_records(records),
            OutputFormat::Table => self.table_records(records),
            OutputFormat::Markdown => self.markdown_records(records),
            OutputFormat::Csv => self.csv_records(records),
        }
    }

    /// Formats products read back from the database, with their import time.
    pub fn format_stored(&self, products: &[StoredProduct]) -> String {
        if products.is_empty() || self.format != OutputFormat::Json {
            let records: Vec<Record> = products.iter().map(|p| p.record.clone()).collect();
            let body = self.format_records(&records);

            return match (self.format, products.first()) {
                (OutputFormat::Table | OutputFormat::Markdown, Some(newest)) => format!(
                    "{}\nLast import: {}",
                    body,
                    newest.import_time.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                _ => body,
            };
        }

        let rows: Vec<serde_json::Value> = products
            .iter()
            .map(|p| {
                let mut row = serde_json::to_value(&p.record).unwrap_or_default();
                if let Some(obj) = row.as_object_mut() {
                    obj.insert("import_time".to_string(), p.import_time.to_rfc3339().into());
                }
                row
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    // JSON formatting

    fn json_records(&self, records: &[Record]) -> String {
        serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_records(&self, records: &[Record]) -> String {
        let vendor_width = 16;
        let seller_width = 22;
        let price_width = 12;
        let name_width = 50;

        let mut lines = Vec::new();

        // Header
        lines.push(format!(
            "{:<vendor_width$}  {:<seller_width$}  {:>price_width$}  {:>price_width$}  {}",
            "Proveedor", "Distribuidor", "Oferta", "Normal", "Producto"
        ));
        lines.push(format!(
            "{:-<vendor_width$}  {:-<seller_width$}  {:-<price_width$}  {:-<price_width$}  {:-<name_width$}",
            "", "", "", "", ""
        ));

        // Rows
        for record in records {
            lines.push(format!(
                "{:<vendor_width$}  {:<seller_width$}  {:>price_width$}  {:>price_width$}  {}",
                truncate(&record.vendor, vendor_width),
                truncate(&record.seller, seller_width),
                or_dash(&record.sale_price),
                or_dash(&record.list_price),
                truncate(&record.name, name_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", records.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_records(&self, records: &[Record]) -> String {
        let mut lines = Vec::new();

        lines.push("| Proveedor | Distribuidor | Producto | Precio Oferta | Precio Normal |".to_string());
        lines.push("|-----------|--------------|----------|---------------|---------------|".to_string());

        for record in records {
            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                md_cell(&record.vendor),
                md_cell(&record.seller),
                md_cell(&truncate(&record.name, 40)),
                md_cell(&record.sale_price),
                md_cell(&record.list_price)
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products found*", records.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_records(&self, records: &[Record]) -> String {
        spreadsheet::to_string(records)
            .map(|s| s.trim_end_matches('\n').to_string())
            .unwrap_or_else(|_| Record::HEADERS.join(","))
    }
}

/// Shortens `s` to at most `width` characters, ending in "..." when cut.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn md_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
