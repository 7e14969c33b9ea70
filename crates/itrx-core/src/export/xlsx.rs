//! Minimal SpreadsheetML writer.
//!
//! Every cell is written as a shared string. Missing cells are left out, so
//! blank separator rows carry no cells at all.

use crate::error::ItrxError;
use crate::export::{zip_error, ExportUnit, Sheet, WorkbookWriter};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAX_SHEET_NAME: usize = 31;
const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_HEAD: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Writes export units as `.xlsx` workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl WorkbookWriter for XlsxWriter {
    fn write(&self, unit: &ExportUnit, path: &Path) -> Result<(), ItrxError> {
        let file = std::fs::File::create(path)?;
        write_workbook(unit, file)
    }
}

/// Serialize `unit` as an xlsx archive into `out`.
///
/// A unit without sheets gets one empty sheet; workbooks need at least one.
pub fn write_workbook<W: Write + Seek>(unit: &ExportUnit, out: W) -> Result<(), ItrxError> {
    let placeholder;
    let sheets: Vec<&Sheet> = if unit.sheets.is_empty() {
        placeholder = Sheet {
            name: "Sheet1".into(),
            rows: Vec::new(),
            column_widths: Vec::new(),
        };
        vec![&placeholder]
    } else {
        unit.sheets.iter().collect()
    };

    let names = unique_sheet_names(sheets.iter().map(|s| s.name.as_str()));
    let mut strings = SharedStrings::default();
    let sheet_xml: Vec<String> = sheets
        .iter()
        .map(|sheet| worksheet_xml(sheet, &mut strings))
        .collect();

    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default();

    put(&mut zip, options, "[Content_Types].xml", &content_types(sheets.len()))?;
    put(&mut zip, options, "_rels/.rels", &format!("{XML_HEADER}{ROOT_RELS}"))?;
    put(&mut zip, options, "xl/workbook.xml", &workbook_xml(&names))?;
    put(&mut zip, options, "xl/_rels/workbook.xml.rels", &workbook_rels(sheets.len()))?;
    put(&mut zip, options, "xl/styles.xml", &format!("{XML_HEADER}{STYLES}"))?;
    put(&mut zip, options, "xl/sharedStrings.xml", &strings.to_xml())?;
    for (i, xml) in sheet_xml.iter().enumerate() {
        put(&mut zip, options, &format!("xl/worksheets/sheet{}.xml", i + 1), xml)?;
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

fn put<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    content: &str,
) -> Result<(), ItrxError> {
    zip.start_file(name, options).map_err(zip_error)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

#[derive(Debug, Default)]
struct SharedStrings {
    index: HashMap<String, usize>,
    values: Vec<String>,
    count: usize,
}

impl SharedStrings {
    fn intern(&mut self, value: &str) -> usize {
        self.count += 1;
        if let Some(&i) = self.index.get(value) {
            return i;
        }
        let i = self.values.len();
        self.index.insert(value.to_string(), i);
        self.values.push(value.to_string());
        i
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"{XML_HEADER}<sst xmlns="{NS_MAIN}" count="{}" uniqueCount="{}">"#,
            self.count,
            self.values.len()
        );
        for value in &self.values {
            let _ = write!(xml, r#"<si><t xml:space="preserve">{}</t></si>"#, escape(value.as_str()));
        }
        xml.push_str("</sst>");
        xml
    }
}

fn worksheet_xml(sheet: &Sheet, strings: &mut SharedStrings) -> String {
    let mut xml = format!(r#"{XML_HEADER}<worksheet xmlns="{NS_MAIN}">"#);

    if !sheet.column_widths.is_empty() {
        xml.push_str("<cols>");
        for (i, width) in sheet.column_widths.iter().enumerate() {
            let _ = write!(xml, r#"<col min="{0}" max="{0}" width="{width}" customWidth="1"/>"#, i + 1);
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    for (r, row) in sheet.rows.iter().enumerate() {
        let cells: Vec<(usize, &str)> = row
            .iter()
            .enumerate()
            .filter_map(|(c, cell)| cell.as_deref().filter(|s| !s.is_empty()).map(|s| (c, s)))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let _ = write!(xml, r#"<row r="{}">"#, r + 1);
        for (c, value) in cells {
            let idx = strings.intern(&xml_safe(value));
            let _ = write!(xml, r#"<c r="{}{}" t="s"><v>{idx}</v></c>"#, column_letter(c), r + 1);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = format!("{XML_HEADER}{CONTENT_TYPES_HEAD}");
    for i in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = format!(r#"{XML_HEADER}<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><sheets>"#);
    for (i, name) in names.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(name.as_str()),
            i + 1,
            i + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = format!(
        r#"{XML_HEADER}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for i in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{i}" Type="{NS_REL}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{NS_REL}/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    );
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{NS_REL}/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    );
    xml.push_str("</Relationships>");
    xml
}

/// Zero-based column index to spreadsheet letters: 0 -> A, 26 -> AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|&c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Sheet names valid for a workbook: at most 31 characters, none of
/// `[]:*?/\`, unique ignoring case.
pub fn unique_sheet_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken: Vec<String> = Vec::new();
    let mut out = Vec::new();

    for (i, raw) in names.enumerate() {
        let cleaned: String = raw
            .chars()
            .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
            .filter(|c| !c.is_control())
            .collect();
        let cleaned = cleaned.trim().trim_matches('\'').to_string();
        let base = if cleaned.is_empty() {
            format!("Sheet{}", i + 1)
        } else {
            cleaned
        };

        let mut candidate = truncate_chars(&base, MAX_SHEET_NAME);
        let mut n = 2;
        while taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            candidate = format!("{}{}", truncate_chars(&base, keep), suffix);
            n += 1;
        }
        taken.push(candidate.to_lowercase());
        out.push(candidate);
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
