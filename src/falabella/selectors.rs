//! Element locators for the Falabella storefront.
//!
//! This file contains the default lookups used by the scraper. Every one of
//! them can be overridden from the `[selectors]` config section.
//!
//! **Update process**: When extraction comes back empty, capture the page
//! HTML, fix the locator here, and add a fixture under `tests/fixtures/`.

use crate::driver::Locator;
use serde::{Deserialize, Serialize};

/// Default locator strings, in `kind:value` form.
pub mod defaults {
    /// Search text box on the landing page.
    pub const SEARCH_INPUT: &str = "class:SearchBar-module_searchBar__Input__NDqpk";

    /// Magnifier button next to the search box.
    pub const SEARCH_BUTTON: &str = "class:SearchBar-module_searchIcon__-gxub";

    /// Results container; its presence means results rendered.
    pub const RESULTS: &str = "id:testId-searchResults";

    /// Product card inside the results container.
    pub const PRODUCT: &str = "class:search-results-4-grid";

    /// Brand line on a product card.
    pub const VENDOR: &str = "class:pod-title";

    /// "Por <seller>" line; ids carry a per-card suffix.
    pub const SELLER: &str = "css:[id*=testId-pod-displaySellerText]";

    /// Product title.
    pub const NAME: &str = "class:pod-subTitle";

    /// Highlighted (offer) price.
    pub const SALE_PRICE: &str = "class:high";

    /// Regular price.
    pub const LIST_PRICE: &str = "class:medium";

    /// Right arrow of the bottom pagination bar.
    pub const NEXT_PAGE: &str = "id:testId-pagination-bottom-arrow-right";
}

fn parse_default(raw: &'static str) -> Locator {
    // Defaults are constants covered by tests
    raw.parse().unwrap_or_else(|_| Locator::css(raw))
}

/// Every lookup the scraper performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub search_input: Locator,
    pub search_button: Locator,
    pub results: Locator,
    pub product: Locator,
    pub vendor: Locator,
    pub seller: Locator,
    pub name: Locator,
    pub sale_price: Locator,
    pub list_price: Locator,
    pub next_page: Locator,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            search_input: parse_default(defaults::SEARCH_INPUT),
            search_button: parse_default(defaults::SEARCH_BUTTON),
            results: parse_default(defaults::RESULTS),
            product: parse_default(defaults::PRODUCT),
            vendor: parse_default(defaults::VENDOR),
            seller: parse_default(defaults::SELLER),
            name: parse_default(defaults::NAME),
            sale_price: parse_default(defaults::SALE_PRICE),
            list_price: parse_default(defaults::LIST_PRICE),
            next_page: parse_default(defaults::NEXT_PAGE),
        }
    }
}

impl SiteSelectors {
    /// The five per-card field lookups, in record order.
    pub fn fields(&self) -> [&Locator; 5] {
        [&self.vendor, &self.seller, &self.name, &self.sale_price, &self.list_price]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    const ALL_DEFAULTS: [&str; 10] = [
        defaults::SEARCH_INPUT,
        defaults::SEARCH_BUTTON,
        defaults::RESULTS,
        defaults::PRODUCT,
        defaults::VENDOR,
        defaults::SELLER,
        defaults::NAME,
        defaults::SALE_PRICE,
        defaults::LIST_PRICE,
        defaults::NEXT_PAGE,
    ];

    #[test]
    fn test_defaults_parse_as_locators() {
        for raw in ALL_DEFAULTS {
            assert!(raw.parse::<Locator>().is_ok(), "bad default locator: {}", raw);
        }
    }

    #[test]
    fn test_defaults_compile_as_css() {
        for raw in ALL_DEFAULTS {
            let locator: Locator = raw.parse().unwrap();
            assert!(Selector::parse(&locator.to_css()).is_ok(), "bad css for {}", raw);
        }
    }

    #[test]
    fn test_field_lookups_do_not_overlap() {
        let selectors = SiteSelectors::default();
        let fields = selectors.fields();

        for (i, a) in fields.iter().enumerate() {
            for b in fields.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_seller_matches_id_substring() {
        let html = Html::parse_fragment(
            r#"<div class="search-results-4-grid">
                <b id="testId-pod-displaySellerText-1234">Por Falabella</b>
            </div>"#,
        );

        let selector = Selector::parse(&SiteSelectors::default().seller.to_css()).unwrap();
        let found: Vec<_> = html.select(&selector).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text().collect::<String>(), "Por Falabella");
    }

    #[test]
    fn test_partial_override_from_toml() {
        let toml = r#"
            vendor = "class:brand-name"
            next_page = "css:button.next"
        "#;

        let selectors: SiteSelectors = toml::from_str(toml).unwrap();
        assert_eq!(selectors.vendor, Locator::class("brand-name"));
        assert_eq!(selectors.next_page, Locator::css("button.next"));
        assert_eq!(selectors.product, SiteSelectors::default().product);
    }
}
