use itrx_core::document::DocumentParser;
use itrx_core::error::ItrxError;
use itrx_core::export::xlsx::XlsxWriter;
use itrx_core::export::{document_unit, WidthPolicy, WorkbookWriter};
use itrx_core::fields::{load_fields_config, year_column};
use itrx_core::metadata::MetadataPatterns;
use std::path::PathBuf;

use crate::output;
use crate::{FormArgs, SourceArgs};

/// Events shown by the table view; JSON output carries all of them.
const EVENT_DISPLAY_LIMIT: usize = 50;

pub struct ParseRequest {
    pub input_file: PathBuf,
    pub form: FormArgs,
    pub source: SourceArgs,
    pub fields: Option<PathBuf>,
    pub year: Option<String>,
    pub events: bool,
    pub xlsx: Option<PathBuf>,
    pub output: String,
}

pub fn run(req: ParseRequest) -> Result<(), ItrxError> {
    let config = super::load_form(&req.form)?;
    let fields = req.fields.as_deref().map(load_fields_config).transpose()?;

    let mut parser =
        DocumentParser::new(&config).with_patterns(MetadataPatterns::for_anchor(req.form.taxpayer_anchor));
    if let Some(fields) = &fields {
        parser = parser.with_fields(fields);
    }

    let source_name = req
        .input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| req.input_file.display().to_string());
    let bytes = std::fs::read(&req.input_file).map_err(|e| ItrxError::SourceRead {
        file: source_name.clone(),
        reason: e.to_string(),
    })?;

    let extractor = super::extractor(&req.source);
    let rows = extractor.extract_rows(&bytes)?.into_rows();
    let outcome = parser.parse_rows_traced(&source_name, &rows);
    let doc = &outcome.document;

    if let Some(path) = &req.xlsx {
        let unit = document_unit(doc, WidthPolicy::Floor);
        XlsxWriter.write(&unit, path)?;
        eprintln!(
            "Wrote {} sheet(s) for {} to {}",
            unit.sheets.len(),
            doc.key(),
            path.display()
        );
    }

    match req.output.as_str() {
        "json" if req.events => output::json::print(&outcome)?,
        "json" => output::json::print(doc)?,
        _ => {
            output::table::print_document(doc);
            if fields.is_some() {
                let label = req.year.as_deref().unwrap_or("Value");
                output::table::print_fields(&year_column(&doc.fields), label);
            }
            if req.events {
                println!();
                print!("{}", outcome.scan_log.render(EVENT_DISPLAY_LIMIT));
                let unclosed = outcome.scan_log.unclosed_sections();
                if !unclosed.is_empty() {
                    println!("Unclosed: {}", unclosed.join(", "));
                }
            }
        }
    }

    Ok(())
}
