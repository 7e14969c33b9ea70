//! Regex-driven scalar field extraction.
//!
//! A fields configuration is independent of the section configuration: each
//! entry names a schedule header and a row pattern, and yields one record of
//! named values from the first matching row inside that schedule.

use crate::error::ItrxError;
use crate::model::{row_text, Row};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Key that, when present in a record, is the value reported for the year.
pub const AMOUNT_CALCULATED: &str = "AMOUNT_CALCULATED";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    #[default]
    String,
    Numeric,
}

/// One field entry as written in a fields configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    #[serde(rename = "KEYS", default)]
    pub keys: Vec<String>,
    #[serde(rename = "PATTERN", default)]
    pub pattern: String,
    #[serde(rename = "HEADER_PATTERN", default)]
    pub header_pattern: String,
    #[serde(rename = "TYPE", default)]
    pub field_type: FieldType,
    #[serde(rename = "EXPECTED_ROW_LEN", default)]
    pub expected_row_len: Option<usize>,
}

#[derive(Debug, Clone)]
struct CompiledField {
    def: FieldDef,
    pattern: Regex,
    header: Regex,
}

/// A loaded fields configuration with compiled patterns.
#[derive(Debug, Clone)]
pub struct FieldsConfig {
    fields: Vec<CompiledField>,
}

impl FieldsConfig {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn load_fields_config(path: &Path) -> Result<FieldsConfig, ItrxError> {
    let content = std::fs::read_to_string(path).map_err(|e| ItrxError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_fields_config(&content).map_err(|e| ItrxError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Parse a fields configuration: an object of entries, each carrying its own `id`.
pub fn parse_fields_config(json: &str) -> Result<FieldsConfig, ItrxError> {
    let entries: BTreeMap<String, FieldDef> = serde_json::from_str(json)?;
    let fields = entries
        .into_values()
        .map(compile_field)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FieldsConfig { fields })
}

fn compile_field(def: FieldDef) -> Result<CompiledField, ItrxError> {
    let compile = |which: &str, raw: &str| {
        RegexBuilder::new(unwrap_raw_literal(raw))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ItrxError::ConfigInvalid(format!("field '{}' has an invalid {}: {}", def.id, which, e))
            })
    };
    let pattern = compile("PATTERN", &def.pattern)?;
    let header = compile("HEADER_PATTERN", &def.header_pattern)?;
    Ok(CompiledField {
        def,
        pattern,
        header,
    })
}

/// Strip a quoted raw-string wrapper (`r'...'` or `'...'`) from a pattern.
pub fn unwrap_raw_literal(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_prefix('r').filter(|rest| rest.starts_with('\'')).unwrap_or(s);
    match s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
        Some(inner) => inner,
        None => s,
    }
}

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(Decimal),
    Text(String),
}

impl FieldValue {
    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            FieldValue::Amount(d) => Some(*d),
            FieldValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Amount(d) => write!(f, "{d}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Parse an Indian-formatted amount ("1,50,000.00") as a whole number.
///
/// Grouping commas and the fractional part are dropped. Text that is not a
/// number is kept as-is.
pub fn clean_amount(raw: &str) -> FieldValue {
    let stripped = raw.trim().replace(',', "");
    let whole = stripped.split('.').next().unwrap_or("");
    match whole.parse::<i64>() {
        Ok(n) => FieldValue::Amount(Decimal::from(n)),
        Err(_) => FieldValue::Text(raw.to_string()),
    }
}

/// Named values for one field entry, in `KEYS` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    values: Vec<(String, FieldValue)>,
}

impl FieldRecord {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<&FieldValue> {
        self.values.first().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Run every field entry over the row stream.
///
/// Every configured id is present in the result; an entry without `KEYS` or
/// without a match inside its schedule yields an empty record.
pub fn extract_fields(rows: &[Row], config: &FieldsConfig) -> BTreeMap<String, FieldRecord> {
    let texts: Vec<String> = rows.iter().map(|r| row_text(r)).collect();

    config
        .fields
        .iter()
        .map(|field| {
            let record = if field.def.keys.is_empty() {
                FieldRecord::default()
            } else {
                extract_one(rows, &texts, field).unwrap_or_default()
            };
            (field.def.id.clone(), record)
        })
        .collect()
}

fn extract_one(rows: &[Row], texts: &[String], field: &CompiledField) -> Option<FieldRecord> {
    let mut in_schedule = false;
    for (row, text) in rows.iter().zip(texts) {
        if field.header.is_match(text) {
            in_schedule = true;
        }
        if !in_schedule {
            continue;
        }
        let Some(caps) = field.pattern.captures(text) else {
            continue;
        };

        let keys = &field.def.keys;
        let values = match field.def.field_type {
            FieldType::Numeric if field.def.expected_row_len == Some(row.len()) => {
                let tail = row.len().saturating_sub(keys.len());
                keys.iter()
                    .enumerate()
                    .map(|(i, key)| {
                        let cell = row.get(tail + i).cloned().flatten().unwrap_or_default();
                        (key.clone(), clean_amount(&cell))
                    })
                    .collect()
            }
            field_type => keys
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let group = caps.get(i + 1).map(|m| m.as_str().trim()).unwrap_or("");
                    let value = match field_type {
                        FieldType::Numeric => clean_amount(group),
                        FieldType::String => FieldValue::Text(group.to_string()),
                    };
                    (key.clone(), value)
                })
                .collect(),
        };
        return Some(FieldRecord { values });
    }
    None
}

/// Project extracted records onto one column of values.
///
/// A record's `AMOUNT_CALCULATED` value wins (re-cleaned as an amount);
/// otherwise its first value is used. Empty records map to `None`.
pub fn year_column(records: &BTreeMap<String, FieldRecord>) -> BTreeMap<String, Option<FieldValue>> {
    records
        .iter()
        .map(|(id, record)| {
            let value = match record.get(AMOUNT_CALCULATED) {
                Some(v) => Some(clean_amount(&v.to_string())),
                None => record.first().cloned(),
            };
            (id.clone(), value)
        })
        .collect()
}
