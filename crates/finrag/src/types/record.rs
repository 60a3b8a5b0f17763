//! Persisted extraction representation
//!
//! The boundary format read and written by the API layer. Page text is not
//! part of the record; only its length is, alongside every extracted table
//! and validated entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::document::{Document, DocumentMetadata};
use super::entity::{FinancialMetric, IsinRecord};
use super::table::TableCandidate;

/// Per-page summary in the persisted record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRecord {
    pub page_number: u32,
    pub text_length: usize,
}

/// Extracted financial entities grouped for persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinancialData {
    /// Checksum-validated ISINs only
    pub isin_numbers: Vec<IsinRecord>,
    /// Metrics keyed by normalized metric key
    pub metrics: BTreeMap<String, Vec<FinancialMetric>>,
}

/// The full persisted document record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub document_id: Uuid,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageRecord>,
    /// Tables keyed by page number
    pub tables: BTreeMap<u32, Vec<TableCandidate>>,
    pub financial_data: FinancialData,
}

impl DocumentRecord {
    /// Build the record from a document and its extraction output
    pub fn from_extraction(
        document: &Document,
        tables: &[TableCandidate],
        isins: &[IsinRecord],
        metrics: &[FinancialMetric],
    ) -> Self {
        let pages = document
            .pages
            .iter()
            .map(|p| PageRecord {
                page_number: p.page_number,
                text_length: p.raw_text.len(),
            })
            .collect();

        let mut table_map: BTreeMap<u32, Vec<TableCandidate>> = BTreeMap::new();
        for table in tables {
            table_map
                .entry(table.page_number)
                .or_default()
                .push(table.clone());
        }

        let mut metric_map: BTreeMap<String, Vec<FinancialMetric>> = BTreeMap::new();
        for metric in metrics {
            metric_map
                .entry(metric.metric_key.clone())
                .or_default()
                .push(metric.clone());
        }

        Self {
            document_id: document.id,
            metadata: document.metadata.clone(),
            pages,
            tables: table_map,
            financial_data: FinancialData {
                isin_numbers: isins.to_vec(),
                metrics: metric_map,
            },
        }
    }

    /// All tables across pages, in page order
    pub fn all_tables(&self) -> Vec<&TableCandidate> {
        self.tables.values().flatten().collect()
    }

    /// All metrics across keys
    pub fn all_metrics(&self) -> Vec<&FinancialMetric> {
        self.financial_data.metrics.values().flatten().collect()
    }
}
