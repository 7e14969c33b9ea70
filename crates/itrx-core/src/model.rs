use crate::fields::FieldRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single extracted cell. `None` is a missing cell, distinct from an empty string.
pub type Cell = Option<String>;

/// One extracted table row, index-addressable within its document.
pub type Row = Vec<Cell>;

/// Join a row's non-empty cells into one space-separated string.
///
/// This is the text every pattern in the engine is matched against.
pub fn row_text(row: &[Cell]) -> String {
    row.iter()
        .filter_map(|c| c.as_deref())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Half-open row range `[start, end)` over a document's row stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRange {
    pub start: usize,
    pub end: usize,
}

impl SectionRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &SectionRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for SectionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A cleaned table with translated column labels.
///
/// The row that supplied the raw labels stays in `rows` as ordinary data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledTable {
    pub labels: Vec<String>,
    pub rows: Vec<Row>,
}

/// Scalar identity fields recovered from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdentity {
    /// Acknowledgement number of the filing.
    pub ack: Option<String>,
    /// Filing date as printed; not validated as a calendar date.
    pub filing_date: Option<String>,
    /// PAN of the taxpayer, used as the grouping key for export.
    pub taxpayer_id: Option<String>,
}

/// One section of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub name: String,
    pub range: SectionRange,
    pub table: LabeledTable,
    /// Identity row, label row, then data rows, all positionally indexed.
    pub block: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub source_name: String,
    #[serde(flatten)]
    pub identity: DocumentIdentity,
    /// Sections in the order they were completed in the row stream.
    pub sections: Vec<DocumentSection>,
    /// Field records by id, when a fields configuration was supplied.
    #[serde(default, skip_deserializing, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldRecord>,
}

impl ParsedDocument {
    /// Key under which this document is stored in a batch result.
    pub fn key(&self) -> &str {
        self.identity.ack.as_deref().unwrap_or(&self.source_name)
    }

    pub fn section(&self, name: &str) -> Option<&DocumentSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }
}
