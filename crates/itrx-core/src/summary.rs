use crate::model::ParsedDocument;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Filing-date layouts seen on acknowledgements, day first. Two-digit years
/// are tried first since `%Y` would also accept them.
const DATE_FORMATS: &[&str] = &[
    "%d-%b-%y", "%d-%b-%Y", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d %b %Y", "%d-%B-%Y",
];

/// Parse a printed filing date. Unrecognized text yields `None`.
pub fn parse_filing_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// One line of the batch overview, pointing back at its document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow<'a> {
    pub key: &'a str,
    pub taxpayer_id: Option<&'a str>,
    pub filing_date: Option<NaiveDate>,
    pub sections: Vec<&'a str>,
    #[serde(skip)]
    pub document: &'a ParsedDocument,
}

impl<'a> SummaryRow<'a> {
    pub fn new(key: &'a str, document: &'a ParsedDocument) -> Self {
        Self {
            key,
            taxpayer_id: document.identity.taxpayer_id.as_deref(),
            filing_date: document
                .identity
                .filing_date
                .as_deref()
                .and_then(parse_filing_date),
            sections: document.sections.iter().map(|s| s.name.as_str()).collect(),
            document,
        }
    }
}

/// `None` after every `Some`.
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total order over summary rows: taxpayer id, then filing date, nulls last,
/// then key.
pub fn summary_order(a: &SummaryRow<'_>, b: &SummaryRow<'_>) -> Ordering {
    nulls_last(&a.taxpayer_id, &b.taxpayer_id)
        .then_with(|| nulls_last(&a.filing_date, &b.filing_date))
        .then_with(|| a.key.cmp(b.key))
}

/// Build and sort summary rows for `(key, document)` pairs.
pub fn summarize<'a, I>(documents: I) -> Vec<SummaryRow<'a>>
where
    I: IntoIterator<Item = (&'a str, &'a ParsedDocument)>,
{
    let mut rows: Vec<SummaryRow<'a>> = documents
        .into_iter()
        .map(|(key, doc)| SummaryRow::new(key, doc))
        .collect();
    rows.sort_by(summary_order);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentIdentity;

    fn doc(name: &str, ack: Option<&str>, pan: Option<&str>, date: Option<&str>) -> ParsedDocument {
        ParsedDocument {
            source_name: name.into(),
            identity: DocumentIdentity {
                ack: ack.map(Into::into),
                filing_date: date.map(Into::into),
                taxpayer_id: pan.map(Into::into),
            },
            sections: vec![],
            fields: Default::default(),
        }
    }

    #[test]
    fn test_parse_filing_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 4, 1);
        assert_eq!(parse_filing_date("01-Apr-2023"), expected);
        assert_eq!(parse_filing_date("01-04-2023"), expected);
        assert_eq!(parse_filing_date("01/04/2023"), expected);
        assert_eq!(parse_filing_date("2023-04-01"), expected);
        assert_eq!(parse_filing_date(" 01-APR-2023 "), expected);
        assert_eq!(parse_filing_date("sometime in April"), None);
    }

    #[test]
    fn test_orders_by_taxpayer_then_date() {
        // two filings of one taxpayer, newer first in input
        let newer = doc("a.pdf", Some("2"), Some("ABCDE1234F"), Some("01-Apr-2023"));
        let older = doc("b.pdf", Some("1"), Some("ABCDE1234F"), Some("01-Apr-2022"));
        let rows = summarize([("2", &newer), ("1", &older)]);
        assert_eq!(rows[0].key, "1");
        assert_eq!(rows[1].key, "2");
    }

    #[test]
    fn test_nulls_sort_last() {
        let a = doc("a.pdf", None, None, Some("01-Apr-2020"));
        let b = doc("b.pdf", None, Some("ZZZZZ9999Z"), Some("garbled"));
        let c = doc("c.pdf", None, Some("ZZZZZ9999Z"), Some("01-Apr-2024"));
        let d = doc("d.pdf", None, Some("AAAAA0000A"), None);
        let rows = summarize([("a.pdf", &a), ("b.pdf", &b), ("c.pdf", &c), ("d.pdf", &d)]);
        let keys: Vec<&str> = rows.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["d.pdf", "c.pdf", "b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_resorting_is_noop() {
        let a = doc("a.pdf", None, Some("ABCDE1234F"), Some("01-Apr-2023"));
        let b = doc("b.pdf", None, None, None);
        let mut rows = summarize([("b.pdf", &b), ("a.pdf", &a)]);
        let before: Vec<&str> = rows.iter().map(|r| r.key).collect();
        rows.sort_by(summary_order);
        let after: Vec<&str> = rows.iter().map(|r| r.key).collect();
        assert_eq!(before, after);
    }
}
