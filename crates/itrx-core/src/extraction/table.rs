use crate::extraction::PageTable;
use crate::model::Row;

/// Indentation (in columns) past the page margin that marks an empty leading cell.
const INDENT_CELL_WIDTH: usize = 2;

/// Reconstruct a page's table from `pdftotext -layout` output.
///
/// -layout keeps column alignment with runs of spaces, so:
/// - every non-blank line is a row, split into cells on gaps of 2+ spaces
/// - a line indented past the page's left margin starts with an empty cell
/// - a blank line inside the table becomes an empty-first-cell row with all
///   other cells missing (consecutive blank lines collapse into one)
/// - rows are padded with missing cells to the page's widest row
///
/// A page where no line splits into two or more cells has no table.
pub fn page_table_from_layout(page_number: usize, text: &str) -> PageTable {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(indentation)
        .min()
        .unwrap_or(0);

    let mut lines: Vec<Option<Row>> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if matches!(lines.last(), Some(Some(_))) {
                lines.push(None);
            }
            continue;
        }

        let mut cells: Row = Vec::new();
        if indentation(line) >= margin + INDENT_CELL_WIDTH {
            cells.push(Some(String::new()));
        }
        cells.extend(
            split_by_whitespace_gaps(line)
                .into_iter()
                .map(|s| Some(s.to_string())),
        );
        lines.push(Some(cells));
    }
    while matches!(lines.last(), Some(None)) {
        lines.pop();
    }

    let has_table = lines
        .iter()
        .flatten()
        .any(|cells| cells.iter().flatten().filter(|c| !c.is_empty()).count() >= 2);
    if !has_table {
        return PageTable {
            page_number,
            rows: Vec::new(),
        };
    }

    let width = lines.iter().flatten().map(Vec::len).max().unwrap_or(1);
    let rows = lines
        .into_iter()
        .map(|line| {
            let mut row = line.unwrap_or_else(|| vec![Some(String::new())]);
            row.resize(width, None);
            row
        })
        .collect();

    PageTable { page_number, rows }
}

fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Split a line by gaps of 2+ whitespace characters.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut gap_start = 0;
    let mut space_count = 0;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if space_count == 0 {
                gap_start = i;
            }
            space_count += 1;
            if space_count == 2 {
                if let Some(s) = start {
                    segments.push(&line[s..gap_start]);
                    start = None;
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            space_count = 0;
        }
    }

    if let Some(s) = start {
        segments.push(line[s..].trim_end());
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_whitespace_gaps() {
        let segments = split_by_whitespace_gaps("  Total Deductions     1,75,000   1,75,000");
        assert_eq!(segments, vec!["Total Deductions", "1,75,000", "1,75,000"]);
    }

    #[test]
    fn test_page_table_rows_are_fixed_arity() {
        let text = "\
Details of Tax Deducted at Source from Salary
Sl     (1)            (2)
1      MUMA12345B     ACME LTD
";
        let page = page_table_from_layout(3, text);
        assert_eq!(page.page_number, 3);
        assert_eq!(page.rows.len(), 3);
        assert!(page.rows.iter().all(|r| r.len() == 3));
        assert_eq!(page.rows[0][1], None);
        assert_eq!(page.rows[2][2].as_deref(), Some("ACME LTD"));
    }

    #[test]
    fn test_indented_line_gets_empty_first_cell() {
        let text = "\
Section     Amount
    80C     1,50,000
";
        let page = page_table_from_layout(1, text);
        assert_eq!(page.rows[1][0].as_deref(), Some(""));
        assert_eq!(page.rows[1][1].as_deref(), Some("80C"));
    }

    #[test]
    fn test_blank_lines_become_sentinel_rows() {
        let text = "\n\nSl     (1)\n\n\n1      MUMA12345B\n\n";
        let page = page_table_from_layout(1, text);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[1], vec![Some(String::new()), None]);
    }

    #[test]
    fn test_page_without_multi_cell_line_has_no_table() {
        let page = page_table_from_layout(2, "Just a paragraph of text\nand another line\n");
        assert!(page.rows.is_empty());
    }
}
