//! Cross-document aggregation into per-taxpayer workbooks.
//!
//! Documents are grouped by taxpayer id and ordered by filing date. Each
//! configured section becomes one sheet holding every contributing
//! document's provenance block followed by a blank separator row.

pub mod bundle;
pub mod xlsx;

use crate::error::ItrxError;
use crate::model::{ParsedDocument, Row};
use crate::summary::SummaryRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Column width limit, in characters.
pub const WIDTH_LIMIT: usize = 60;

/// Characters added to the widest cell of a column.
pub const WIDTH_PADDING: usize = 2;

/// How the width limit applies to a column's content width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthPolicy {
    /// Content width plus padding, capped at the limit.
    #[default]
    Ceiling,
    /// Content width plus padding, never narrower than the limit.
    Floor,
}

impl WidthPolicy {
    pub fn apply(self, content_width: usize) -> usize {
        let padded = content_width + WIDTH_PADDING;
        match self {
            WidthPolicy::Ceiling => padded.min(WIDTH_LIMIT),
            WidthPolicy::Floor => padded.max(WIDTH_LIMIT),
        }
    }
}

impl std::str::FromStr for WidthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ceiling" => Ok(WidthPolicy::Ceiling),
            "floor" => Ok(WidthPolicy::Floor),
            other => Err(format!("unknown width policy '{other}' (expected ceiling or floor)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
    pub column_widths: Vec<usize>,
}

impl Sheet {
    pub fn new(name: &str, mut rows: Vec<Row>, policy: WidthPolicy) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, None);
        }
        let column_widths = column_widths(&rows, policy);
        Self {
            name: name.to_string(),
            rows,
            column_widths,
        }
    }
}

/// Display width of each column.
///
/// A column's content width is the longer of its positional label and its
/// longest cell, counted in characters; missing cells count as empty.
pub fn column_widths(rows: &[Row], policy: WidthPolicy) -> Vec<usize> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            let label = col.to_string().chars().count();
            let content = rows
                .iter()
                .filter_map(|row| row.get(col).cloned().flatten())
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            policy.apply(label.max(content))
        })
        .collect()
}

/// One workbook: a taxpayer's consolidated sections, or a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportUnit {
    /// Taxpayer id (or document key) the workbook is named after.
    pub name: String,
    pub sheets: Vec<Sheet>,
    /// Keys of the documents merged into this unit, in merge order.
    pub documents: Vec<String>,
}

impl ExportUnit {
    pub fn file_name(&self) -> String {
        format!("{}.xlsx", sanitize_file_stem(&self.name))
    }
}

/// Workbooks to write, plus documents that could not be assigned to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    pub units: Vec<ExportUnit>,
    /// Keys of documents without a taxpayer id.
    pub unassigned: Vec<String>,
}

fn date_nulls_last(a: &SummaryRow<'_>, b: &SummaryRow<'_>) -> Ordering {
    match (a.filing_date, b.filing_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Group summary rows by taxpayer id and build one unit per taxpayer.
///
/// `section_names` is the configured section universe in configuration
/// order; sections no document in a group has produce no sheet.
pub fn build_export_units<'s, I>(summary: &[SummaryRow<'_>], section_names: I, policy: WidthPolicy) -> ExportPlan
where
    I: IntoIterator<Item = &'s str>,
{
    let section_names: Vec<&str> = section_names.into_iter().collect();
    let mut groups: BTreeMap<&str, Vec<&SummaryRow<'_>>> = BTreeMap::new();
    let mut plan = ExportPlan::default();

    for row in summary {
        match row.taxpayer_id {
            Some(id) => groups.entry(id).or_default().push(row),
            None => {
                warn!(key = row.key, "document has no taxpayer id, not exported");
                plan.unassigned.push(row.key.to_string());
            }
        }
    }

    for (taxpayer_id, mut group) in groups {
        group.sort_by(|a, b| date_nulls_last(a, b));

        let sheets = section_names
            .iter()
            .filter_map(|section| merged_sheet(section, &group, policy))
            .collect();

        plan.units.push(ExportUnit {
            name: taxpayer_id.to_string(),
            sheets,
            documents: group.iter().map(|r| r.key.to_string()).collect(),
        });
    }

    plan
}

fn merged_sheet(section: &str, group: &[&SummaryRow<'_>], policy: WidthPolicy) -> Option<Sheet> {
    let mut rows: Vec<Row> = Vec::new();
    for summary_row in group {
        if let Some(found) = summary_row.document.section(section) {
            rows.extend(found.block.iter().cloned());
            rows.push(Vec::new());
        }
    }
    (!rows.is_empty()).then(|| Sheet::new(section, rows, policy))
}

/// A workbook for a single document: one sheet per section it contains.
pub fn document_unit(document: &ParsedDocument, policy: WidthPolicy) -> ExportUnit {
    ExportUnit {
        name: document.key().to_string(),
        sheets: document
            .sections
            .iter()
            .map(|s| Sheet::new(&s.name, s.block.clone(), policy))
            .collect(),
        documents: vec![document.key().to_string()],
    }
}

/// Serializes an export unit to a workbook file.
pub trait WorkbookWriter: Send + Sync {
    fn write(&self, unit: &ExportUnit, path: &Path) -> Result<(), ItrxError>;

    /// File extension of written workbooks, without the dot.
    fn extension(&self) -> &str {
        "xlsx"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Failure message by unit name.
    pub failed: BTreeMap<String, String>,
    pub unassigned: Vec<String>,
}

/// Write every unit of `plan` into `out_dir`.
///
/// A unit that fails to write is recorded and the rest continue.
pub fn export_plan(plan: &ExportPlan, out_dir: &Path, writer: &dyn WorkbookWriter) -> Result<ExportReport, ItrxError> {
    std::fs::create_dir_all(out_dir)?;
    let mut report = ExportReport {
        unassigned: plan.unassigned.clone(),
        ..ExportReport::default()
    };

    for unit in &plan.units {
        match export_unit(unit, out_dir, writer) {
            Ok(path) => {
                info!(path = %path.display(), sheets = unit.sheets.len(), "workbook written");
                report.written.push(path);
            }
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "workbook export failed");
                report.failed.insert(unit.name.clone(), e.to_string());
            }
        }
    }
    Ok(report)
}

/// Write one unit as `<out_dir>/<name>.<ext>`.
pub fn export_unit(unit: &ExportUnit, out_dir: &Path, writer: &dyn WorkbookWriter) -> Result<PathBuf, ItrxError> {
    let path = out_dir.join(format!("{}.{}", sanitize_file_stem(&unit.name), writer.extension()));
    writer.write(unit, &path).map_err(|e| ItrxError::ExportWrite {
        taxpayer_id: unit.name.clone(),
        reason: e.to_string(),
    })?;
    Ok(path)
}

pub(crate) fn zip_error(e: zip::result::ZipError) -> ItrxError {
    ItrxError::Io(std::io::Error::other(e))
}

/// Replace characters that are unsafe in file names.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ' ');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}
