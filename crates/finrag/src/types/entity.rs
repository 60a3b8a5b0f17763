//! Extracted financial entities with provenance

use serde::{Deserialize, Serialize};

/// A checksum-validated ISIN with its surrounding text.
///
/// Only validated records are ever constructed; candidates failing the
/// checksum are discarded at extraction time, not stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsinRecord {
    /// The 12-character code
    pub code: String,
    /// Checksum result. Always true for stored records.
    pub validated: bool,
    /// Surrounding text retained for provenance
    pub context: String,
    /// Page the code was found on, 1-based
    pub page_number: u32,
}

/// Unit classification for a metric value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    /// Monetary amount
    Currency,
    /// Percentage
    Percent,
    /// Plain count
    Count,
}

/// A financial metric tagged from a keyword near a numeric token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialMetric {
    /// Normalized key, e.g. "total_assets"
    pub metric_key: String,
    /// Value token as it appeared on the page
    pub raw_value_text: String,
    /// Parsed numeric value, when the token was parseable
    pub parsed_numeric_value: Option<f64>,
    /// Unit classification
    pub unit: MetricUnit,
    /// Page the metric was found on, 1-based
    pub page_number: u32,
    /// Surrounding text retained for provenance
    pub context: String,
}

/// A date mention, normalized when one of the known formats matched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateMention {
    /// Date text as it appeared on the page
    pub raw_text: String,
    /// Normalized value, None when unparseable
    pub value: Option<chrono::NaiveDate>,
    /// Page the date was found on, 1-based
    pub page_number: u32,
}

/// A monetary amount or percentage mention
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmountMention {
    /// Amount text as it appeared on the page
    pub raw_text: String,
    /// Normalized value, None when unparseable
    pub value: Option<f64>,
    /// Currency symbol or ISO code, when present
    pub currency: Option<String>,
    /// Trailing percent sign was present
    pub is_percent: bool,
    /// Page the amount was found on, 1-based
    pub page_number: u32,
}

/// All entities extracted from a single page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageEntities {
    pub isins: Vec<IsinRecord>,
    pub dates: Vec<DateMention>,
    pub amounts: Vec<AmountMention>,
    pub metrics: Vec<FinancialMetric>,
}

impl PageEntities {
    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.isins.is_empty()
            && self.dates.is_empty()
            && self.amounts.is_empty()
            && self.metrics.is_empty()
    }
}
