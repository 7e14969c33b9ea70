use crate::model::{DocumentIdentity, LabeledTable, Row};

pub const ACK_LABEL: &str = "Acknowledgement";
pub const FILING_DATE_LABEL: &str = "Date of Filing";
pub const TAXPAYER_ID_LABEL: &str = "PAN";

/// Build the exportable block for one section.
///
/// Row 1 identifies the section and document, row 2 spells out the column
/// labels, and the table's data rows follow. Every row is padded to the same
/// width; no column metadata survives beyond these two literal rows.
pub fn build_block(section: &str, identity: &DocumentIdentity, table: &LabeledTable) -> Vec<Row> {
    let identity_row: Row = vec![
        Some(section.to_string()),
        Some(ACK_LABEL.to_string()),
        identity.ack.clone(),
        Some(FILING_DATE_LABEL.to_string()),
        identity.filing_date.clone(),
        Some(TAXPAYER_ID_LABEL.to_string()),
        identity.taxpayer_id.clone(),
    ];

    let label_row: Row = table
        .labels
        .iter()
        .map(|label| (!label.is_empty()).then(|| label.clone()))
        .collect();

    let mut block = Vec::with_capacity(table.rows.len() + 2);
    block.push(identity_row);
    block.push(label_row);
    block.extend(table.rows.iter().cloned());

    let width = block.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut block {
        row.resize(width, None);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DocumentIdentity {
        DocumentIdentity {
            ack: Some("123456789012345".into()),
            filing_date: Some("31-Jul-2023".into()),
            taxpayer_id: Some("ABCDE1234F".into()),
        }
    }

    #[test]
    fn test_block_layout() {
        let table = LabeledTable {
            labels: vec!["Section".into(), "Amount".into()],
            rows: vec![
                vec![Some("Section".into()), Some("(1)".into())],
                vec![Some("80C".into()), Some("150000".into())],
            ],
        };
        let block = build_block("Deductions", &identity(), &table);

        assert_eq!(block.len(), 4);
        assert_eq!(block[0][0].as_deref(), Some("Deductions"));
        assert_eq!(block[0][2].as_deref(), Some("123456789012345"));
        assert_eq!(block[0][6].as_deref(), Some("ABCDE1234F"));
        assert_eq!(block[1][1].as_deref(), Some("Amount"));
        assert_eq!(block[3][0].as_deref(), Some("80C"));
        assert!(block.iter().all(|r| r.len() == 7));
    }

    #[test]
    fn test_wide_table_widens_identity_row() {
        let table = LabeledTable {
            labels: (0..9).map(|i| format!("c{i}")).collect(),
            rows: vec![],
        };
        let block = build_block("Wide", &DocumentIdentity::default(), &table);
        assert_eq!(block.len(), 2);
        assert!(block.iter().all(|r| r.len() == 9));
        assert_eq!(block[0][2], None);
    }
}
