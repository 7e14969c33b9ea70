use crate::model::{row_text, Row};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Filing disclaimer printed under tables of e-filed returns.
pub const DISCLAIMER_NOISE: &str = r"this\s+(?:form|return)\s+(?:has\s+been|is)\s+(?:digitally\s+signed|electronically\s+(?:filed|transmitted)|verified|submitted)|filed\s+electronically\s+(?:and|without)";

/// Acknowledgement-number boilerplate repeated in page headers.
pub const ACK_NOISE: &str = r"acknowledgement\s+(?:number|no\.?)\s*:?";

static DEFAULT_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [DISCLAIMER_NOISE, ACK_NOISE]
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("builtin noise pattern is valid")
        })
        .collect()
});

/// Normalizes raw row slices into rectangular, noise-free tables.
///
/// Cleaning is idempotent: a cleaned table cleans to itself.
#[derive(Debug, Clone)]
pub struct RowCleaner {
    noise: Vec<Regex>,
}

impl Default for RowCleaner {
    fn default() -> Self {
        Self {
            noise: DEFAULT_NOISE.clone(),
        }
    }
}

impl RowCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clean(&self, rows: &[Row]) -> Vec<Row> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let trimmed: Vec<Row> = rows
            .iter()
            .map(|row| {
                let mut cells: Row = row
                    .iter()
                    .map(|cell| {
                        cell.as_deref()
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    })
                    .collect();
                cells.resize(width, None);
                cells
            })
            .collect();

        let compact = drop_missing(trimmed);

        let filtered: Vec<Row> = compact
            .into_iter()
            .filter(|row| {
                let text = row_text(row);
                !self.noise.iter().any(|re| re.is_match(&text))
            })
            .collect();

        // Dropping noise rows can empty a column; compact again so the
        // result is a fixed point.
        drop_missing(filtered)
    }
}

/// Drop rows, then columns, that contain no values at all.
fn drop_missing(rows: Vec<Row>) -> Vec<Row> {
    let rows: Vec<Row> = rows
        .into_iter()
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    let width = rows.first().map_or(0, Vec::len);
    let keep: Vec<bool> = (0..width)
        .map(|col| rows.iter().any(|row| row[col].is_some()))
        .collect();

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> Row {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_trims_and_blanks_become_missing() {
        let cleaned = RowCleaner::new().clean(&[row(&[Some("  80C "), Some("   "), Some("100")])]);
        assert_eq!(cleaned, vec![row(&[Some("80C"), Some("100")])]);
    }

    #[test]
    fn test_drops_missing_rows_and_columns() {
        let rows = vec![
            row(&[Some("a"), None, Some("b")]),
            row(&[None, None, None]),
            row(&[Some(""), None, Some("c")]),
        ];
        let cleaned = RowCleaner::new().clean(&rows);
        assert_eq!(
            cleaned,
            vec![row(&[Some("a"), Some("b")]), row(&[None, Some("c")])]
        );
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let rows = vec![row(&[Some("a")]), row(&[Some("b"), Some("c")])];
        let cleaned = RowCleaner::new().clean(&rows);
        assert_eq!(cleaned[0], row(&[Some("a"), None]));
    }

    #[test]
    fn test_noise_rows_dropped() {
        let rows = vec![
            row(&[Some("Acknowledgement Number : 123456789012345"), None]),
            row(&[Some("This return has been digitally signed"), None]),
            row(&[Some("80C"), Some("150000")]),
        ];
        let cleaned = RowCleaner::new().clean(&rows);
        assert_eq!(cleaned, vec![row(&[Some("80C"), Some("150000")])]);
    }

    #[test]
    fn test_column_emptied_by_noise_is_dropped() {
        let rows = vec![
            row(&[Some("x"), Some("Acknowledgement No. 1")]),
            row(&[Some("y"), None]),
        ];
        let cleaned = RowCleaner::new().clean(&rows);
        assert_eq!(cleaned, vec![row(&[Some("y")])]);
    }

    #[test]
    fn test_row_with_no_remaining_columns_is_dropped() {
        let rows = vec![row(&[None, Some(" ")]), row(&[Some(""), None])];
        let cleaned = RowCleaner::new().clean(&rows);
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_clean_is_fixed_point() {
        let rows = vec![
            row(&[Some(" Section "), Some("(1)"), None, Some("(2)")]),
            row(&[Some("80C"), Some(" 150,000 "), None, None]),
            row(&[None, None, None, None]),
            row(&[Some("Acknowledgement Number: 1"), None, None, Some("z")]),
            row(&[Some("80D"), None, None, Some("25,000")]),
        ];
        let cleaner = RowCleaner::new();
        let once = cleaner.clean(&rows);
        let twice = cleaner.clean(&once);
        assert_eq!(once, twice);
    }
}
