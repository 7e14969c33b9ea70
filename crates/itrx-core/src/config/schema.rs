use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel end pattern: the section ends on a row whose first cell is
/// empty and whose remaining cells are all missing.
pub const EMPTY_ROW_SENTINEL: &str = "<empty_row_specific>";

/// Header marker used when a section does not declare any.
pub const DEFAULT_HEADER_MARKER: &str = "(1)";

/// Configuration for one form type, keyed by section name.
///
/// Key order is significant: it is the order start patterns are tried in and
/// the order sheets are written in.
#[derive(Debug, Clone, Default)]
pub struct FormConfigDef {
    pub sections: Vec<(String, SectionDef)>,
}

/// One section's boundary and relabeling rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    /// Regex matched against a row's joined text to open the section.
    #[serde(alias = "table_start_ptr")]
    pub start_pattern: String,
    /// Literal cell values that identify the section's column-header row.
    #[serde(default, alias = "hdr_row_map", skip_serializing_if = "Option::is_none")]
    pub header_markers: Option<Vec<String>>,
    /// Regex closing the section, or [`EMPTY_ROW_SENTINEL`]. Empty means absent.
    #[serde(default, alias = "ftr_row_map", skip_serializing_if = "Option::is_none")]
    pub end_pattern: Option<String>,
    /// Raw column label -> final label.
    #[serde(default, alias = "hdr_rename")]
    pub header_rename: BTreeMap<String, String>,
    /// Leading rows of the sliced range to drop before cleaning.
    #[serde(default, alias = "leading_row_skip", skip_serializing_if = "Option::is_none")]
    pub indentation_skip: Option<usize>,
}

impl FormConfigDef {
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }
}

impl<'de> Deserialize<'de> for FormConfigDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedSections;

        impl<'de> Visitor<'de> for OrderedSections {
            type Value = FormConfigDef;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object keyed by section name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut sections: Vec<(String, SectionDef)> = Vec::new();
                while let Some((name, def)) = map.next_entry::<String, SectionDef>()? {
                    // Duplicate keys keep the first position and the last value.
                    match sections.iter_mut().find(|(n, _)| *n == name) {
                        Some(slot) => slot.1 = def,
                        None => sections.push((name, def)),
                    }
                }
                Ok(FormConfigDef { sections })
            }
        }

        deserializer.deserialize_map(OrderedSections)
    }
}

impl Serialize for FormConfigDef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, def) in &self.sections {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}
