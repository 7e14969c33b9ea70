use crate::model::{LabeledTable, Row};
use std::collections::BTreeMap;

/// Relabel a cleaned table's columns from its first row.
///
/// Each raw label is looked up (trimmed) in `rename`; unknown labels pass
/// through unchanged. The first row is kept as a data row: header text varies
/// across form revisions and is preserved as content.
pub fn normalize_headers(rows: Vec<Row>, rename: &BTreeMap<String, String>) -> LabeledTable {
    let labels = match rows.first() {
        Some(first) => first
            .iter()
            .map(|cell| {
                let raw = cell.as_deref().unwrap_or("").trim();
                rename
                    .get(raw)
                    .cloned()
                    .unwrap_or_else(|| raw.to_string())
            })
            .collect(),
        None => Vec::new(),
    };

    LabeledTable { labels, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> Row {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_labels_translated_and_first_row_kept() {
        let rename = BTreeMap::from([
            ("(1)".to_string(), "TAN of Deductor".to_string()),
            ("(2)".to_string(), "Name of Deductor".to_string()),
        ]);
        let rows = vec![
            row(&[Some("Sl"), Some("(1)"), Some("(2)")]),
            row(&[Some("1"), Some("MUMA12345B"), Some("ACME LTD")]),
        ];
        let table = normalize_headers(rows.clone(), &rename);
        assert_eq!(table.labels, vec!["Sl", "TAN of Deductor", "Name of Deductor"]);
        assert_eq!(table.rows, rows);
    }

    #[test]
    fn test_missing_label_cell_becomes_empty_label() {
        let table = normalize_headers(vec![row(&[None, Some("(1)")])], &BTreeMap::new());
        assert_eq!(table.labels, vec!["", "(1)"]);
    }

    #[test]
    fn test_empty_table() {
        let table = normalize_headers(vec![], &BTreeMap::new());
        assert!(table.labels.is_empty());
        assert!(table.rows.is_empty());
    }
}
