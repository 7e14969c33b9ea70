pub mod batch;
pub mod cleaning;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extraction;
pub mod fields;
pub mod headers;
pub mod metadata;
pub mod model;
pub mod provenance;
pub mod sections;
pub mod summary;

use batch::{BatchOptions, BatchProcessor, BatchResult};
use config::FormConfig;
use document::DocumentParser;
use error::ItrxError;
use export::{build_export_units, export_plan, ExportReport, WidthPolicy, WorkbookWriter};
use extraction::TableExtractor;
use model::ParsedDocument;
use std::path::Path;
use summary::SummaryRow;

/// Parse a single document with the default metadata patterns.
pub fn parse_document(
    source_name: &str,
    pdf_bytes: &[u8],
    extractor: &dyn TableExtractor,
    config: &FormConfig,
) -> Result<ParsedDocument, ItrxError> {
    DocumentParser::new(config).parse_pdf(source_name, pdf_bytes, extractor)
}

/// Process every source document in `dir`.
///
/// Per-document failures land in [`BatchResult::errors`]; calling this again
/// on an unchanged directory yields an equal result.
pub fn process_all(
    dir: &Path,
    parser: DocumentParser<'_>,
    options: BatchOptions,
    extractor: &dyn TableExtractor,
) -> Result<BatchResult, ItrxError> {
    BatchProcessor::new(dir, parser, options).process_all(extractor)
}

/// Summary rows of a batch, ordered by taxpayer id then filing date.
pub fn summarize(result: &BatchResult) -> Vec<SummaryRow<'_>> {
    result.summary()
}

/// Write one workbook per taxpayer id into `out_dir`.
///
/// Every configured section is considered, in configuration order. A
/// workbook that fails to write does not stop the others.
pub fn export_by_taxpayer(
    result: &BatchResult,
    config: &FormConfig,
    out_dir: &Path,
    policy: WidthPolicy,
    writer: &dyn WorkbookWriter,
) -> Result<ExportReport, ItrxError> {
    let summary = result.summary();
    let plan = build_export_units(&summary, config.section_names(), policy);
    export_plan(&plan, out_dir, writer)
}
