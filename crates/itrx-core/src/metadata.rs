use crate::error::ItrxError;
use crate::model::{row_text, DocumentIdentity, Row};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Acknowledgement number and filing date, captured from the same row.
pub const ACK_PATTERN: &str =
    r"Acknowledgement\s+Number\s*:\s*(\d+).*?Date\s+of\s+Filing\s*:\s*([\w\-/]+)";

/// PAN following a generic "PAN" label.
pub const PAN_LABEL_PATTERN: &str = r"\bPAN\b\s*:?\s*([A-Z0-9]{10})\b";

/// PAN inside the "(A1) PAN ... (A2)" field anchor of the form's general part.
pub const PAN_BRACKETED_PATTERN: &str = r"\(A1\)\s*PAN\s*:?\s*([A-Z0-9]{10})\s*\(A2\)";

static ACK_RE: Lazy<Regex> = Lazy::new(|| compile_builtin(ACK_PATTERN));
static PAN_LABEL_RE: Lazy<Regex> = Lazy::new(|| compile_builtin(PAN_LABEL_PATTERN));
static PAN_BRACKETED_RE: Lazy<Regex> = Lazy::new(|| compile_builtin(PAN_BRACKETED_PATTERN));

fn compile_builtin(pattern: &str) -> Regex {
    build(pattern).expect("builtin metadata pattern is valid")
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

/// Where the taxpayer id is anchored in the row text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxpayerAnchor {
    #[default]
    Label,
    Bracketed,
}

impl std::str::FromStr for TaxpayerAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "label" => Ok(TaxpayerAnchor::Label),
            "bracketed" => Ok(TaxpayerAnchor::Bracketed),
            other => Err(format!("unknown taxpayer anchor '{other}' (expected label or bracketed)")),
        }
    }
}

/// Patterns used to recover a document's identity fields.
#[derive(Debug, Clone)]
pub struct MetadataPatterns {
    ack: Regex,
    taxpayer_id: Regex,
}

impl Default for MetadataPatterns {
    fn default() -> Self {
        Self::for_anchor(TaxpayerAnchor::Label)
    }
}

impl MetadataPatterns {
    pub fn for_anchor(anchor: TaxpayerAnchor) -> Self {
        let taxpayer_id = match anchor {
            TaxpayerAnchor::Label => PAN_LABEL_RE.clone(),
            TaxpayerAnchor::Bracketed => PAN_BRACKETED_RE.clone(),
        };
        Self {
            ack: ACK_RE.clone(),
            taxpayer_id,
        }
    }

    /// Custom patterns. `ack` needs two capture groups (number, date),
    /// `taxpayer_id` one.
    pub fn new(ack: &str, taxpayer_id: &str) -> Result<Self, ItrxError> {
        let ack = build(ack)
            .map_err(|e| ItrxError::ConfigInvalid(format!("invalid acknowledgement pattern: {e}")))?;
        let taxpayer_id = build(taxpayer_id)
            .map_err(|e| ItrxError::ConfigInvalid(format!("invalid taxpayer id pattern: {e}")))?;
        if ack.captures_len() < 3 {
            return Err(ItrxError::ConfigInvalid(
                "acknowledgement pattern needs two capture groups".into(),
            ));
        }
        if taxpayer_id.captures_len() < 2 {
            return Err(ItrxError::ConfigInvalid(
                "taxpayer id pattern needs a capture group".into(),
            ));
        }
        Ok(Self { ack, taxpayer_id })
    }
}

/// Scan rows once for the acknowledgement number, filing date and PAN.
///
/// Stops as soon as both the acknowledgement and the PAN are known. Fields
/// that never match stay `None`. The PAN is uppercased.
pub fn extract_identity(rows: &[Row], patterns: &MetadataPatterns) -> DocumentIdentity {
    let mut identity = DocumentIdentity::default();

    for row in rows {
        let text = row_text(row);

        if identity.ack.is_none() {
            if let Some(caps) = patterns.ack.captures(&text) {
                identity.ack = caps.get(1).map(|m| m.as_str().trim().to_string());
                identity.filing_date = caps.get(2).map(|m| m.as_str().trim().to_string());
            }
        }

        if identity.taxpayer_id.is_none() {
            if let Some(caps) = patterns.taxpayer_id.captures(&text) {
                identity.taxpayer_id = caps.get(1).map(|m| m.as_str().trim().to_uppercase());
            }
        }

        if identity.ack.is_some() && identity.taxpayer_id.is_some() {
            break;
        }
    }

    identity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Row> {
        lines
            .iter()
            .map(|cells| cells.iter().map(|c| Some(c.to_string())).collect())
            .collect()
    }

    #[test]
    fn test_ack_and_date_from_one_row() {
        let rows = rows(&[
            &["INDIAN INCOME TAX RETURN ACKNOWLEDGEMENT"],
            &[
                "Acknowledgement Number : 123456789012345",
                "Date of Filing : 31-Jul-2023",
            ],
            &["PAN", "ABCDE1234F"],
        ]);
        let id = extract_identity(&rows, &MetadataPatterns::default());
        assert_eq!(id.ack.as_deref(), Some("123456789012345"));
        assert_eq!(id.filing_date.as_deref(), Some("31-Jul-2023"));
        assert_eq!(id.taxpayer_id.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let rows = rows(&[&["Nothing to see"], &["PAN", "short"]]);
        let id = extract_identity(&rows, &MetadataPatterns::default());
        assert_eq!(id, DocumentIdentity::default());
    }

    #[test]
    fn test_first_match_wins() {
        let rows = rows(&[
            &["PAN ABCDE1234F"],
            &["PAN ZZZZZ9999Z"],
            &["Acknowledgement Number: 1 Date of Filing: 01-04-2023"],
        ]);
        let id = extract_identity(&rows, &MetadataPatterns::default());
        assert_eq!(id.taxpayer_id.as_deref(), Some("ABCDE1234F"));
        assert_eq!(id.filing_date.as_deref(), Some("01-04-2023"));
    }

    #[test]
    fn test_pan_normalized_to_uppercase() {
        let rows = rows(&[&["PAN", "abcde1234f"]]);
        let id = extract_identity(&rows, &MetadataPatterns::default());
        assert_eq!(id.taxpayer_id.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn test_label_not_matched_inside_words() {
        let rows = rows(&[&["COMPANY1234567890 details"]]);
        let id = extract_identity(&rows, &MetadataPatterns::default());
        assert_eq!(id.taxpayer_id, None);
    }

    #[test]
    fn test_bracketed_anchor() {
        let rows = rows(&[
            &["PAN of employer", "AAAAA0000A"],
            &["(A1) PAN", "ABCDE1234F", "(A2) Name", "RAVI KUMAR"],
        ]);
        let id = extract_identity(&rows, &MetadataPatterns::for_anchor(TaxpayerAnchor::Bracketed));
        assert_eq!(id.taxpayer_id.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn test_custom_patterns_validated() {
        assert!(MetadataPatterns::new(r"Ack (\d+)", r"PAN (\w+)").is_err());
        assert!(MetadataPatterns::new(r"Ack (\d+) on (\S+)", r"PAN").is_err());
        assert!(MetadataPatterns::new(r"Ack (\d+) on (\S+)", r"PAN (\w+)").is_ok());
    }
}
