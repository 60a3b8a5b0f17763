//! Reconstructed table structures

use serde::{Deserialize, Serialize};

/// A table derived from unstructured page text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableCandidate {
    /// Page the table was found on, 1-based
    pub page_number: u32,
    /// Header cells; empty when the block had no header row
    pub header: Vec<String>,
    /// Data rows, padded with empty strings to equal length
    pub rows: Vec<Vec<String>>,
    /// Fraction of rows matching the block's modal token count (0.0-1.0)
    pub confidence: f32,
    /// First line of the source extent in the page text, 0-based
    pub line_start: usize,
    /// Last line of the source extent, inclusive
    pub line_end: usize,
}

impl TableCandidate {
    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (header or widest row)
    pub fn column_count(&self) -> usize {
        self.header
            .len()
            .max(self.rows.iter().map(|r| r.len()).max().unwrap_or(0))
    }

    /// Whether this candidate's source lines overlap another's
    pub fn overlaps(&self, other: &TableCandidate) -> bool {
        self.page_number == other.page_number
            && self.line_start <= other.line_end
            && other.line_start <= self.line_end
    }
}

/// A cell value with its normalized numeric interpretation, when one exists.
/// The raw string is always preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericCell {
    /// Cell text as it appeared on the page
    pub raw: String,
    /// Parsed value with thousands separators and symbols stripped
    pub value: Option<f64>,
    /// Trailing percent sign was present
    pub is_percent: bool,
    /// Currency symbol or ISO code attached to the value
    pub currency: Option<String>,
}
