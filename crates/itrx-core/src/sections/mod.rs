//! Section boundary detection.
//!
//! A single left-to-right pass over a document's rows that partitions the
//! stream into named, half-open row ranges. The pass keeps one small piece of
//! state, the section currently being captured and its confirmed start row,
//! and never backtracks.
//!
//! Per row, in order:
//! 1. Every section's start pattern is tried against the row's joined text in
//!    configuration order. The first match makes that section current and
//!    clears any confirmed start, abandoning a section that was open but not
//!    yet closed.
//! 2. With a current section but no confirmed start, a row whose first cell is
//!    non-empty and which contains one of the section's header markers
//!    confirms the start (inclusive). The row is not end-tested.
//! 3. With a confirmed start, the end condition is evaluated. When it holds
//!    the range `[start, row + 1)` is recorded and the state is cleared.

pub mod events;

use crate::config::{EndCondition, FormConfig, SectionSpec};
use crate::model::{row_text, Cell, Row, SectionRange};
use events::{EndTrigger, ScanEvent, ScanEventKind, ScanObserver};
use serde::Serialize;
use tracing::debug;

/// Section name -> row range, in the order sections were first completed.
///
/// A section that completes twice keeps its first position and its last range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionRanges {
    entries: Vec<(String, SectionRange)>,
}

impl SectionRanges {
    pub fn insert(&mut self, name: &str, range: SectionRange) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = range,
            None => self.entries.push((name.to_string(), range)),
        }
    }

    pub fn get(&self, name: &str) -> Option<SectionRange> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, range)| *range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SectionRange)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct ScanState<'c> {
    current: Option<&'c SectionSpec>,
    pending_start: Option<usize>,
}

/// Find every configured section's row range.
pub fn scan_sections(rows: &[Row], config: &FormConfig) -> SectionRanges {
    scan_sections_observed(rows, config, &mut ())
}

/// Like [`scan_sections`], reporting every state transition to `observer`.
pub fn scan_sections_observed<O>(rows: &[Row], config: &FormConfig, observer: &mut O) -> SectionRanges
where
    O: ScanObserver + ?Sized,
{
    let mut state = ScanState::default();
    let mut ranges = SectionRanges::default();

    for (idx, row) in rows.iter().enumerate() {
        let text = row_text(row);

        if let Some(spec) = config.sections().iter().find(|s| s.start.is_match(&text)) {
            debug!(row = idx, section = %spec.name, "start pattern matched");
            emit(observer, idx, &spec.name, ScanEventKind::StartMatch, None, &text);
            state.current = Some(spec);
            state.pending_start = None;
        }

        let Some(spec) = state.current else {
            continue;
        };

        let Some(start) = state.pending_start else {
            if is_header_row(row, &spec.header_markers) {
                debug!(row = idx, section = %spec.name, "header row confirmed");
                emit(observer, idx, &spec.name, ScanEventKind::HeaderMatch, None, &text);
                state.pending_start = Some(idx);
            }
            continue;
        };

        let trigger = match &spec.end {
            EndCondition::Pattern(re) if re.is_match(&text) => Some(EndTrigger::Pattern),
            EndCondition::EmptyRow if is_empty_row_specific(row) => Some(EndTrigger::EmptyRow),
            _ => None,
        };

        if let Some(trigger) = trigger {
            let range = SectionRange {
                start,
                end: idx + 1,
            };
            debug!(row = idx, section = %spec.name, %range, "section completed");
            emit(observer, idx, &spec.name, ScanEventKind::EndMatch, Some(trigger), &text);
            emit(observer, idx, &spec.name, ScanEventKind::SectionCompleted, None, "");
            ranges.insert(&spec.name, range);
            state = ScanState::default();
        }
    }

    if let Some(spec) = state.current {
        debug!(section = %spec.name, "row stream ended with section still open");
    }

    ranges
}

fn emit<O: ScanObserver + ?Sized>(
    observer: &mut O,
    row: usize,
    section: &str,
    kind: ScanEventKind,
    trigger: Option<EndTrigger>,
    text: &str,
) {
    if !observer.enabled() {
        return;
    }
    observer.record(ScanEvent {
        row,
        section: section.to_string(),
        kind,
        trigger,
        text: (!text.is_empty()).then(|| text.to_string()),
    });
}

/// A column-header row: non-empty first cell and at least one marker cell.
pub fn is_header_row(row: &[Cell], markers: &[String]) -> bool {
    let first_filled = matches!(row.first(), Some(Some(s)) if !s.trim().is_empty());
    first_filled
        && row
            .iter()
            .flatten()
            .any(|cell| markers.iter().any(|m| cell.trim() == m))
}

/// The empty-row end sentinel: first cell empty or missing, every other cell missing.
pub fn is_empty_row_specific(row: &[Cell]) -> bool {
    let Some((first, rest)) = row.split_first() else {
        return false;
    };
    let first_empty = first.as_deref().map_or(true, |s| s.trim().is_empty());
    first_empty && rest.iter().all(Option::is_none)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_str;
    use events::ScanLog;

    fn row(cells: &[Option<&str>]) -> Row {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    fn text_row(s: &str) -> Row {
        vec![Some(s.to_string()), None, None]
    }

    fn filler(n: usize) -> Vec<Row> {
        (0..n).map(|i| text_row(&format!("line {i}"))).collect()
    }

    const CONFIG: &str = r#"{
        "Deductions": {
            "start_pattern": "Part C - Deductions",
            "end_pattern": "Total Deductions"
        },
        "TDS": {
            "start_pattern": "Details of Tax Deducted",
            "end_pattern": "<empty_row_specific>"
        }
    }"#;

    #[test]
    fn test_start_header_end_yields_inclusive_range() {
        let config = parse_config_str(CONFIG).unwrap();
        let mut rows = filler(5);
        rows.push(text_row("Part C - Deductions"));
        rows.push(row(&[Some("Section"), Some("(1)"), Some("(2)")]));
        rows.push(row(&[Some("80C"), Some("150000"), Some("150000")]));
        rows.push(row(&[Some("80D"), Some("25000"), Some("25000")]));
        rows.push(row(&[Some("Total Deductions"), Some("175000"), None]));
        rows.extend(filler(3));

        let ranges = scan_sections(&rows, &config);
        assert_eq!(
            ranges.get("Deductions"),
            Some(SectionRange { start: 6, end: 10 })
        );
        assert_eq!(ranges.len(), 1);
    }

    #[test]
    fn test_empty_row_sentinel_closes_section() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Details of Tax Deducted at Source from Salary"),
            row(&[Some("Sl"), Some("(1)"), Some("(2)")]),
            row(&[Some("1"), Some("MUMA12345B"), Some("ACME LTD")]),
            row(&[Some(""), None, None]),
            row(&[Some("after"), None, None]),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(ranges.get("TDS"), Some(SectionRange { start: 1, end: 4 }));
    }

    #[test]
    fn test_header_requires_non_empty_first_cell() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Part C - Deductions"),
            row(&[None, Some("(1)"), Some("(2)")]),
            row(&[Some(""), Some("(1)"), Some("(2)")]),
            row(&[Some("Section"), Some("(1)"), Some("(2)")]),
            text_row("Total Deductions"),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(
            ranges.get("Deductions"),
            Some(SectionRange { start: 3, end: 5 })
        );
    }

    #[test]
    fn test_header_row_is_not_end_tested() {
        let config = parse_config_str(
            r#"{ "A": { "start_pattern": "open", "end_pattern": "marker" } }"#,
        )
        .unwrap();
        let rows = vec![
            text_row("open"),
            row(&[Some("marker"), Some("(1)"), None]),
            text_row("marker again"),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(ranges.get("A"), Some(SectionRange { start: 1, end: 3 }));
    }

    #[test]
    fn test_header_confirmed_at_row_zero() {
        let config = parse_config_str(
            r#"{ "A": { "start_pattern": "Schedule A", "end_pattern": "Total" } }"#,
        )
        .unwrap();
        let rows = vec![
            row(&[Some("Schedule A"), Some("(1)"), None]),
            row(&[Some("x"), Some("1"), None]),
            text_row("Total"),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(ranges.get("A"), Some(SectionRange { start: 0, end: 3 }));
    }

    #[test]
    fn test_restart_abandons_open_section() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Part C - Deductions"),
            row(&[Some("Section"), Some("(1)"), None]),
            text_row("Details of Tax Deducted at Source"),
            row(&[Some("Sl"), Some("(1)"), None]),
            row(&[Some(""), None, None]),
            text_row("Total Deductions"),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(ranges.get("TDS"), Some(SectionRange { start: 3, end: 5 }));
        assert_eq!(ranges.get("Deductions"), None);
    }

    #[test]
    fn test_start_beats_end_on_same_row() {
        let config = parse_config_str(
            r#"{
                "A": { "start_pattern": "open a", "end_pattern": "close" },
                "B": { "start_pattern": "close and open b", "end_pattern": "end b" }
            }"#,
        )
        .unwrap();
        let rows = vec![
            text_row("open a"),
            row(&[Some("x"), Some("(1)"), None]),
            text_row("close and open b"),
            row(&[Some("y"), Some("(1)"), None]),
            text_row("end b"),
        ];
        let ranges = scan_sections(&rows, &config);
        assert_eq!(ranges.get("A"), None);
        assert_eq!(ranges.get("B"), Some(SectionRange { start: 3, end: 5 }));
        assert_eq!(ranges.len(), 1);
    }

    #[test]
    fn test_absent_end_never_closes() {
        let config =
            parse_config_str(r#"{ "A": { "start_pattern": "Schedule A" } }"#).unwrap();
        let rows = vec![
            text_row("Schedule A"),
            row(&[Some("x"), Some("(1)"), None]),
            row(&[Some(""), None, None]),
        ];
        assert!(scan_sections(&rows, &config).is_empty());
    }

    #[test]
    fn test_repeated_section_keeps_last_range() {
        let config = parse_config_str(CONFIG).unwrap();
        let block = |rows: &mut Vec<Row>| {
            rows.push(text_row("Part C - Deductions"));
            rows.push(row(&[Some("Section"), Some("(1)"), None]));
            rows.push(text_row("Total Deductions"));
        };
        let mut rows = Vec::new();
        block(&mut rows);
        block(&mut rows);
        let ranges = scan_sections(&rows, &config);
        assert_eq!(
            ranges.get("Deductions"),
            Some(SectionRange { start: 4, end: 6 })
        );
    }

    #[test]
    fn test_well_ordered_sections_do_not_overlap() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Part C - Deductions"),
            row(&[Some("Section"), Some("(1)"), None]),
            row(&[Some("80C"), Some("1"), None]),
            text_row("Total Deductions"),
            text_row("Details of Tax Deducted at Source"),
            row(&[Some("Sl"), Some("(1)"), None]),
            row(&[Some("1"), Some("T"), None]),
            row(&[Some(""), None, None]),
        ];
        let ranges = scan_sections(&rows, &config);
        let all: Vec<SectionRange> = ranges.iter().map(|(_, r)| r).collect();
        assert_eq!(all.len(), 2);
        for r in &all {
            assert!(r.start < r.end && r.end <= rows.len());
        }
        assert!(!all[0].overlaps(&all[1]));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Part C - Deductions"),
            row(&[Some("Section"), Some("(1)"), None]),
            text_row("Total Deductions"),
        ];
        assert_eq!(scan_sections(&rows, &config), scan_sections(&rows, &config));
    }

    #[test]
    fn test_event_log_records_transitions() {
        let config = parse_config_str(CONFIG).unwrap();
        let rows = vec![
            text_row("Part C - Deductions"),
            row(&[Some("Section"), Some("(1)"), None]),
            text_row("Total Deductions"),
        ];
        let mut log = ScanLog::default();
        let observed = scan_sections_observed(&rows, &config, &mut log);
        assert_eq!(observed, scan_sections(&rows, &config));

        let kinds: Vec<ScanEventKind> = log.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScanEventKind::StartMatch,
                ScanEventKind::HeaderMatch,
                ScanEventKind::EndMatch,
                ScanEventKind::SectionCompleted,
            ]
        );
        assert_eq!(log.events()[2].trigger, Some(EndTrigger::Pattern));
    }

    #[test]
    fn test_is_empty_row_specific() {
        assert!(is_empty_row_specific(&row(&[Some(""), None, None])));
        assert!(is_empty_row_specific(&row(&[None, None])));
        assert!(!is_empty_row_specific(&row(&[Some("x"), None])));
        assert!(!is_empty_row_specific(&row(&[Some(""), Some(""), None])));
        assert!(!is_empty_row_specific(&[]));
    }
}
