//! Per-page entity extraction
//!
//! Pure function over page text; safe to run in parallel across pages.

use crate::config::EntityConfig;
use crate::types::{Page, PageEntities};

use super::{isin, metrics, numeric};

/// Extract all financial entities from a page. Pages with an OCR error
/// contribute nothing.
pub fn extract_entities(page: &Page, config: &EntityConfig) -> PageEntities {
    if !page.is_usable() {
        return PageEntities::default();
    }

    let text = page.raw_text.as_str();
    let page_number = page.page_number;

    PageEntities {
        isins: isin::extract(text, page_number, config.context_window),
        dates: numeric::scan_dates(text, page_number),
        amounts: numeric::scan_amounts(text, page_number),
        metrics: metrics::extract(text, page_number, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Page;

    #[test]
    fn share_purchase_line() {
        let page = Page::ok(
            1,
            "ISIN: US0378331005 Apple Inc. 1000 shares at $178.25".to_string(),
            0.95,
        );
        let entities = extract_entities(&page, &EntityConfig::default());

        assert_eq!(entities.isins.len(), 1);
        assert_eq!(entities.isins[0].code, "US0378331005");
        assert!(entities.isins[0].validated);

        assert!(entities
            .amounts
            .iter()
            .any(|a| a.raw_text == "$178.25" && a.value == Some(178.25)));

        // No configured keyword in the text
        assert!(entities.metrics.is_empty());
    }

    #[test]
    fn errored_page_contributes_nothing() {
        let page = Page::failed(2, "provider timeout".to_string());
        let entities = extract_entities(&page, &EntityConfig::default());
        assert!(entities.is_empty());
    }

    #[test]
    fn metric_with_provenance() {
        let page = Page::ok(4, "Summary\nTotal Assets: $1,500,000\n".to_string(), 0.9);
        let entities = extract_entities(&page, &EntityConfig::default());

        assert_eq!(entities.metrics.len(), 1);
        let metric = &entities.metrics[0];
        assert_eq!(metric.metric_key, "total_assets");
        assert_eq!(metric.parsed_numeric_value, Some(1_500_000.0));
        assert_eq!(metric.page_number, 4);
        assert!(metric.context.contains("Total Assets"));
    }
}
