use crate::cleaning::RowCleaner;
use crate::config::FormConfig;
use crate::error::ItrxError;
use crate::extraction::{ExtractedTable, TableExtractor};
use crate::fields::{extract_fields, FieldsConfig};
use crate::headers::normalize_headers;
use crate::metadata::{extract_identity, MetadataPatterns};
use crate::model::{DocumentSection, ParsedDocument, Row};
use crate::provenance::build_block;
use crate::sections::events::{ScanLog, ScanObserver};
use crate::sections::scan_sections_observed;
use serde::Serialize;
use std::collections::BTreeMap;

/// A parsed document together with the section-scan transitions that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub document: ParsedDocument,
    pub scan_log: ScanLog,
}

/// Turns one document's row stream into a [`ParsedDocument`].
///
/// Holds no per-document state; one parser can be shared across threads.
#[derive(Debug, Clone)]
pub struct DocumentParser<'a> {
    config: &'a FormConfig,
    patterns: MetadataPatterns,
    cleaner: RowCleaner,
    fields: Option<&'a FieldsConfig>,
}

impl<'a> DocumentParser<'a> {
    pub fn new(config: &'a FormConfig) -> Self {
        Self {
            config,
            patterns: MetadataPatterns::default(),
            cleaner: RowCleaner::default(),
            fields: None,
        }
    }

    pub fn with_patterns(mut self, patterns: MetadataPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_fields(mut self, fields: &'a FieldsConfig) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Parse an already-extracted row stream.
    pub fn parse_rows(&self, source_name: &str, rows: &[Row]) -> ParsedDocument {
        self.parse_rows_with(source_name, rows, &mut ())
    }

    /// Parse a row stream and keep the section-scan event log.
    pub fn parse_rows_traced(&self, source_name: &str, rows: &[Row]) -> ParseOutcome {
        let mut scan_log = ScanLog::default();
        let document = self.parse_rows_with(source_name, rows, &mut scan_log);
        ParseOutcome { document, scan_log }
    }

    /// Extract the document's tables and parse them.
    ///
    /// Any extraction failure fails the whole document; no partial sections
    /// are returned.
    pub fn parse_pdf(
        &self,
        source_name: &str,
        pdf_bytes: &[u8],
        extractor: &dyn TableExtractor,
    ) -> Result<ParsedDocument, ItrxError> {
        let table = extractor.extract_rows(pdf_bytes)?;
        Ok(self.parse_extracted(source_name, table))
    }

    pub fn parse_extracted(&self, source_name: &str, table: ExtractedTable) -> ParsedDocument {
        let rows = table.into_rows();
        self.parse_rows(source_name, &rows)
    }

    fn parse_rows_with<O>(&self, source_name: &str, rows: &[Row], observer: &mut O) -> ParsedDocument
    where
        O: ScanObserver + ?Sized,
    {
        let identity = extract_identity(rows, &self.patterns);
        let ranges = scan_sections_observed(rows, self.config, observer);

        let mut sections = Vec::with_capacity(ranges.len());
        for (name, range) in ranges.iter() {
            let Some(spec) = self.config.section(name) else {
                continue;
            };
            let slice = &rows[range.start..range.end];
            let slice = slice.get(spec.indentation_skip..).unwrap_or(&[]);
            let cleaned = self.cleaner.clean(slice);
            let table = normalize_headers(cleaned, &spec.header_rename);
            let block = build_block(name, &identity, &table);
            sections.push(DocumentSection {
                name: name.to_string(),
                range,
                table,
                block,
            });
        }

        let fields = match self.fields {
            Some(fields) => extract_fields(rows, fields),
            None => BTreeMap::new(),
        };

        ParsedDocument {
            source_name: source_name.to_string(),
            identity,
            sections,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_str;
    use crate::fields::parse_fields_config;

    fn row(cells: &[Option<&str>]) -> Row {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    fn config() -> FormConfig {
        parse_config_str(
            r#"{
                "TDS on Salary": {
                    "start_pattern": "Details of Tax Deducted at Source from Salary",
                    "end_pattern": "<empty_row_specific>",
                    "header_rename": { "(1)": "TAN", "(2)": "Employer", "Sl": "Sl No" }
                },
                "Deductions": {
                    "start_pattern": "Deductions under Chapter VI-A",
                    "header_markers": ["Section"],
                    "end_pattern": "Total Deductions",
                    "indentation_skip": 1
                }
            }"#,
        )
        .unwrap()
    }

    fn stream() -> Vec<Row> {
        vec![
            row(&[Some("Acknowledgement Number : 998877 Date of Filing : 15-Jul-2023"), None, None]),
            row(&[Some("PAN"), Some("ABCDE1234F"), None]),
            row(&[Some("Details of Tax Deducted at Source from Salary"), None, None]),
            row(&[Some("Sl"), Some("(1)"), Some("(2)")]),
            row(&[Some("1"), Some(" MUMA12345B "), Some("ACME LTD")]),
            row(&[Some(""), None, None]),
            row(&[Some("Deductions under Chapter VI-A"), None, None]),
            row(&[Some("Section"), Some("Amount"), None]),
            row(&[Some("(a)"), Some("(b)"), None]),
            row(&[Some("80C"), Some("1,50,000"), None]),
            row(&[Some("Total Deductions"), Some("1,50,000"), None]),
        ]
    }

    #[test]
    fn test_parse_rows() {
        let config = config();
        let doc = DocumentParser::new(&config).parse_rows("a.pdf", &stream());

        assert_eq!(doc.key(), "998877");
        assert_eq!(doc.identity.taxpayer_id.as_deref(), Some("ABCDE1234F"));
        assert_eq!(doc.section_names(), vec!["TDS on Salary", "Deductions"]);

        let tds = doc.section("TDS on Salary").unwrap();
        assert_eq!((tds.range.start, tds.range.end), (3, 6));
        assert_eq!(tds.table.labels, vec!["Sl No", "TAN", "Employer"]);
        // header row kept as data, sentinel row cleaned away
        assert_eq!(tds.table.rows.len(), 2);
        assert_eq!(tds.table.rows[1][1].as_deref(), Some("MUMA12345B"));
        assert_eq!(tds.block.len(), 4);
        assert_eq!(tds.block[0][0].as_deref(), Some("TDS on Salary"));
    }

    #[test]
    fn test_indentation_skip_drops_leading_rows() {
        let config = config();
        let doc = DocumentParser::new(&config).parse_rows("a.pdf", &stream());
        let deductions = doc.section("Deductions").unwrap();
        assert_eq!((deductions.range.start, deductions.range.end), (7, 11));
        // the "Section" header row is skipped, labels come from "(a) (b)"
        assert_eq!(deductions.table.labels, vec!["(a)", "(b)"]);
        assert_eq!(deductions.table.rows.len(), 3);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let config = config();
        let parser = DocumentParser::new(&config);
        assert_eq!(parser.parse_rows("a.pdf", &stream()), parser.parse_rows("a.pdf", &stream()));
    }

    #[test]
    fn test_traced_parse_records_events() {
        let config = config();
        let outcome = DocumentParser::new(&config).parse_rows_traced("a.pdf", &stream());
        assert_eq!(outcome.document.sections.len(), 2);
        assert!(outcome.scan_log.unclosed_sections().is_empty());
        assert!(!outcome.scan_log.by_section("Deductions").is_empty());
    }

    #[test]
    fn test_missing_ack_keys_by_source_name() {
        let config = config();
        let rows = &stream()[1..];
        let doc = DocumentParser::new(&config).parse_rows("b.pdf", rows);
        assert_eq!(doc.identity.ack, None);
        assert_eq!(doc.key(), "b.pdf");
    }

    #[test]
    fn test_fields_extracted_when_configured() {
        let config = config();
        let fields = parse_fields_config(
            r#"{"ded": {"id": "C1", "KEYS": ["TOTAL"], "PATTERN": "Total Deductions\\s+([\\d,]+)",
                "HEADER_PATTERN": "Chapter VI-A", "TYPE": "NUMERIC"}}"#,
        )
        .unwrap();
        let doc = DocumentParser::new(&config)
            .with_fields(&fields)
            .parse_rows("a.pdf", &stream());
        assert_eq!(doc.fields["C1"].first().and_then(|v| v.as_amount()), Some(rust_decimal_macros::dec!(150000)));
    }

    struct FailingExtractor;

    impl TableExtractor for FailingExtractor {
        fn extract_rows(&self, _pdf_bytes: &[u8]) -> Result<ExtractedTable, ItrxError> {
            Err(ItrxError::NoTables)
        }

        fn backend_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_extraction_failure_fails_document() {
        let config = config();
        let err = DocumentParser::new(&config)
            .parse_pdf("x.pdf", b"", &FailingExtractor)
            .unwrap_err();
        assert!(matches!(err, ItrxError::NoTables));
    }
}
