use crate::error::ItrxError;
use crate::extraction::{ExtractedTable, PageTable, TableExtractor};
use crate::model::Row;

/// Extraction backend for pre-extracted rows.
///
/// The input is a JSON array of pages, each an array of rows of nullable
/// strings: `[[["Sl", "(1)"], ["1", null]], []]`. An empty page array is a
/// page without a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRowsExtractor;

impl TableExtractor for JsonRowsExtractor {
    fn extract_rows(&self, pdf_bytes: &[u8]) -> Result<ExtractedTable, ItrxError> {
        let pages: Vec<Vec<Row>> = serde_json::from_slice(pdf_bytes)
            .map_err(|e| ItrxError::Extraction(format!("invalid row JSON: {e}")))?;

        let table = ExtractedTable {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, rows)| PageTable {
                    page_number: i + 1,
                    rows,
                })
                .collect(),
        };

        if table.row_count() == 0 {
            return Err(ItrxError::NoTables);
        }
        Ok(table)
    }

    fn backend_name(&self) -> &str {
        "json-rows"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_numbered_from_one() {
        let json = br#"[[["Sl", "(1)"], ["1", null]], [], [["Total", "100"]]]"#;
        let table = JsonRowsExtractor.extract_rows(json).unwrap();
        assert_eq!(table.pages.len(), 3);
        assert_eq!(table.pages[2].page_number, 3);
        assert_eq!(table.pages[0].rows[1], vec![Some("1".to_string()), None]);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_no_rows_is_no_tables() {
        let err = JsonRowsExtractor.extract_rows(b"[[], []]").unwrap_err();
        assert!(matches!(err, ItrxError::NoTables));
    }

    #[test]
    fn test_garbage_is_extraction_error() {
        let err = JsonRowsExtractor.extract_rows(b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, ItrxError::Extraction(_)));
    }
}
