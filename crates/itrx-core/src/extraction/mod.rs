pub mod json_rows;
pub mod pdftotext;
pub mod table;

use crate::error::ItrxError;
use crate::model::Row;
use std::fmt::Write;

/// The table found on a single page. A page without a table has no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTable {
    pub page_number: usize,
    pub rows: Vec<Row>,
}

impl PageTable {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Rows extracted from one document, grouped by page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTable {
    pub pages: Vec<PageTable>,
}

impl ExtractedTable {
    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }

    /// The document row stream: page order, then in-page row order.
    pub fn into_rows(self) -> Vec<Row> {
        self.pages.into_iter().flat_map(|p| p.rows).collect()
    }

    /// Human-readable dump of every extracted row with its stream index.
    pub fn render_trace(&self, source_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{source_name}");
        let mut index = 0;
        for page in &self.pages {
            if page.rows.is_empty() {
                let _ = writeln!(
                    out,
                    "#--------- Page:{} No table found on this page. --------#",
                    page.page_number
                );
                continue;
            }
            let _ = writeln!(
                out,
                "#--------- Page:{} Rows:{} Columns:{} --------#",
                page.page_number,
                page.rows.len(),
                page.column_count()
            );
            for row in &page.rows {
                let cells = serde_json::to_string(row).unwrap_or_default();
                let _ = writeln!(out, "{index}|{cells}");
                index += 1;
            }
        }
        out
    }
}

/// Backend that turns a source document into table rows.
pub trait TableExtractor: Send + Sync {
    /// Extract every page's table from the document bytes.
    ///
    /// Fails when the document cannot be read or contains no table at all.
    fn extract_rows(&self, pdf_bytes: &[u8]) -> Result<ExtractedTable, ItrxError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
