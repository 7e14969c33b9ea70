use itrx_core::batch::BatchResult;
use itrx_core::export::ExportReport;
use itrx_core::fields::FieldValue;
use itrx_core::model::{row_text, ParsedDocument};
use itrx_core::summary::SummaryRow;
use std::collections::BTreeMap;

const DASH: &str = "-";

/// Row text is cut to this many characters in previews.
const PREVIEW_WIDTH: usize = 100;

pub fn print_batch(result: &BatchResult) {
    println!(
        "Processed {} document(s), {} failure(s)\n",
        result.documents.len(),
        result.errors.len()
    );

    if !result.documents.is_empty() {
        let width = key_width(result.documents.keys().map(String::as_str));
        for (key, doc) in &result.documents {
            println!(
                "  {:<width$}  {:<20}  {} section(s)",
                key,
                doc.source_name,
                doc.sections.len(),
                width = width
            );
        }
        println!();
    }

    if !result.errors.is_empty() {
        println!("Failures:");
        for (file, reason) in &result.errors {
            println!("  {file}: {reason}");
        }
        println!();
    }
}

pub fn print_summary(summary: &[SummaryRow<'_>]) {
    if summary.is_empty() {
        println!("No documents parsed.");
        return;
    }

    let width = key_width(summary.iter().map(|r| r.key));
    println!(
        "  {:<width$}  {:<10}  {:<10}  Sections",
        "Key",
        "PAN",
        "Filed",
        width = width
    );
    for row in summary {
        let filed = row
            .filing_date
            .map(|d| d.to_string())
            .or_else(|| row.document.identity.filing_date.clone())
            .unwrap_or_else(|| DASH.to_string());
        println!(
            "  {:<width$}  {:<10}  {:<10}  {}",
            row.key,
            row.taxpayer_id.unwrap_or(DASH),
            filed,
            row.sections.join(", "),
            width = width
        );
    }
}

pub fn print_document(doc: &ParsedDocument) {
    println!("=== {} ===\n", doc.source_name);
    println!("  Acknowledgement: {}", doc.identity.ack.as_deref().unwrap_or(DASH));
    println!("  Date of Filing:  {}", doc.identity.filing_date.as_deref().unwrap_or(DASH));
    println!("  PAN:             {}", doc.identity.taxpayer_id.as_deref().unwrap_or(DASH));
    println!();

    if doc.sections.is_empty() {
        println!("  No sections found.");
        return;
    }

    for section in &doc.sections {
        println!(
            "  {} rows {} ({} data row(s))",
            section.name,
            section.range,
            section.table.rows.len()
        );
        println!("    {}", section.table.labels.join(" | "));
        for row in &section.table.rows {
            let text: String = row_text(row).chars().take(PREVIEW_WIDTH).collect();
            println!("    {text}");
        }
        println!();
    }
}

pub fn print_fields(column: &BTreeMap<String, Option<FieldValue>>, label: &str) {
    if column.is_empty() {
        return;
    }

    let width = key_width(column.keys().map(String::as_str));
    println!("  {:<width$}  {}", "Field", label, width = width);
    for (id, value) in column {
        let shown = value.as_ref().map(ToString::to_string).unwrap_or_else(|| DASH.to_string());
        println!("  {:<width$}  {}", id, shown, width = width);
    }
    println!();
}

pub fn print_export_report(report: &ExportReport) {
    eprintln!("Wrote {} workbook(s)", report.written.len());
    for path in &report.written {
        eprintln!("  {}", path.display());
    }
    if !report.unassigned.is_empty() {
        eprintln!("  {} document(s) without PAN not exported:", report.unassigned.len());
        for key in &report.unassigned {
            eprintln!("    {key}");
        }
    }
    for (name, reason) in &report.failed {
        eprintln!("  failed {name}: {reason}");
    }
}

fn key_width<'a>(keys: impl Iterator<Item = &'a str>) -> usize {
    keys.map(|k| k.chars().count()).max().unwrap_or(0).max(3)
}
