//! Data models for scraped listings and scrape runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One product card from a results page.
///
/// Every field holds the text exactly as displayed, or an empty string when
/// the card has no such element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Brand shown on the card
    #[serde(rename = "Proveedor")]
    pub vendor: String,
    /// Seller / distributor line
    #[serde(rename = "Distribuidor")]
    pub seller: String,
    /// Product title
    #[serde(rename = "Producto")]
    pub name: String,
    /// Offer price, as displayed
    #[serde(rename = "Precio Oferta")]
    pub sale_price: String,
    /// Regular price, as displayed
    #[serde(rename = "Precio Normal")]
    pub list_price: String,
}

impl Record {
    /// Column headers used by every export, in field order.
    pub const HEADERS: [&'static str; 5] =
        ["Proveedor", "Distribuidor", "Producto", "Precio Oferta", "Precio Normal"];

    /// Creates a record from its five fields.
    pub fn new(
        vendor: impl Into<String>,
        seller: impl Into<String>,
        name: impl Into<String>,
        sale_price: impl Into<String>,
        list_price: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            seller: seller.into(),
            name: name.into(),
            sale_price: sale_price.into(),
            list_price: list_price.into(),
        }
    }

    /// Field values in header order.
    pub fn fields(&self) -> [&str; 5] {
        [&self.vendor, &self.seller, &self.name, &self.sale_price, &self.list_price]
    }

    /// Returns true if no field could be read.
    pub fn is_blank(&self) -> bool {
        self.fields().iter().all(|f| f.is_empty())
    }
}

/// Why a scrape run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The search never produced a results page.
    SearchFailed,
    /// The last page had no actionable next-page control.
    NoMorePages,
    /// The next-page control was found but could not be activated.
    PagerFailed,
    /// The next-page probe kept failing after all retries.
    ProbeFailed,
    /// The configured page limit was reached while more pages existed.
    PageLimit,
}

impl StopReason {
    /// Returns true if every reachable page was scraped.
    pub fn is_complete(&self) -> bool {
        matches!(self, StopReason::NoMorePages)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::SearchFailed => write!(f, "search failed"),
            StopReason::NoMorePages => write!(f, "no more pages"),
            StopReason::PagerFailed => write!(f, "could not advance to the next page"),
            StopReason::ProbeFailed => write!(f, "next-page check kept failing"),
            StopReason::PageLimit => write!(f, "page limit reached"),
        }
    }
}

/// Result builder for one scrape run.
///
/// Owned by the run and threaded through page extraction by `&mut`.
#[derive(Debug, Default)]
pub struct Harvest {
    records: Vec<Record>,
    page_counts: Vec<usize>,
}

impl Harvest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the records of one visited page.
    pub fn push_page(&mut self, records: Vec<Record>) {
        self.page_counts.push(records.len());
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the builder, keeping only the records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Seals the run into a report.
    pub fn finish(self, query: &str, stop: StopReason) -> ScrapeReport {
        ScrapeReport {
            query: query.to_string(),
            records: self.records,
            page_counts: self.page_counts,
            stop,
        }
    }
}

/// Outcome of one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeReport {
    /// The search query
    pub query: String,
    /// All records, in page then document order
    pub records: Vec<Record>,
    /// Records extracted from each visited page
    pub page_counts: Vec<usize>,
    /// Why the run ended
    pub stop: StopReason,
}

impl ScrapeReport {
    pub fn pages_visited(&self) -> usize {
        self.page_counts.len()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_follow_headers() {
        let record = Record::new("Samsung", "Por Falabella", "Smart TV 55", "S/ 1,599", "S/ 2,199");
        assert_eq!(record.fields(), ["Samsung", "Por Falabella", "Smart TV 55", "S/ 1,599", "S/ 2,199"]);
        assert!(!record.is_blank());
        assert!(Record::default().is_blank());
    }

    #[test]
    fn test_record_serializes_with_export_headers() {
        let record = Record::new("LG", "", "Monitor", "S/ 499", "");
        let json = serde_json::to_value(&record).unwrap();

        for header in Record::HEADERS {
            assert!(json.get(header).is_some(), "missing {}", header);
        }
        assert_eq!(json["Proveedor"], "LG");
        assert_eq!(json["Distribuidor"], "");
    }

    #[test]
    fn test_harvest_tracks_pages() {
        let mut harvest = Harvest::new();
        assert!(harvest.is_empty());

        harvest.push_page(vec![Record::default(), Record::default()]);
        harvest.push_page(Vec::new());
        harvest.push_page(vec![Record::default()]);

        assert_eq!(harvest.len(), 3);

        let report = harvest.finish("tv", StopReason::NoMorePages);
        assert_eq!(report.query, "tv");
        assert_eq!(report.page_counts, vec![2, 0, 1]);
        assert_eq!(report.pages_visited(), 3);
        assert_eq!(report.count(), report.page_counts.iter().sum::<usize>());
        assert!(report.stop.is_complete());
    }

    #[test]
    fn test_stop_reason_serde_and_display() {
        assert_eq!(serde_json::to_string(&StopReason::PageLimit).unwrap(), "\"page_limit\"");
        assert_eq!(StopReason::SearchFailed.to_string(), "search failed");
        assert!(!StopReason::PagerFailed.is_complete());
        assert!(!StopReason::ProbeFailed.is_complete());
    }
}
