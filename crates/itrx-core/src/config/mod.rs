pub mod builtin;
pub mod schema;

use crate::error::ItrxError;
use regex::{Regex, RegexBuilder};
use schema::{FormConfigDef, SectionDef, DEFAULT_HEADER_MARKER, EMPTY_ROW_SENTINEL};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Suffix identifying form configuration files in a config directory.
pub const CONFIG_FILE_SUFFIX: &str = "_header.json";

/// How an open section is closed.
#[derive(Debug, Clone)]
pub enum EndCondition {
    Pattern(Regex),
    EmptyRow,
    Absent,
}

/// A section definition with its patterns compiled.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub start: Regex,
    pub header_markers: Vec<String>,
    pub end: EndCondition,
    pub header_rename: BTreeMap<String, String>,
    pub indentation_skip: usize,
}

/// A validated, compiled form configuration. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct FormConfig {
    sections: Vec<SectionSpec>,
}

impl FormConfig {
    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Every configured section name, in configuration order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

/// Load a form configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<FormConfig, ItrxError> {
    let content = std::fs::read_to_string(path).map_err(|e| ItrxError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse a form configuration from a JSON string.
pub fn parse_config(json: &str, source: &Path) -> Result<FormConfig, ItrxError> {
    let def: FormConfigDef = serde_json::from_str(json).map_err(|e| ItrxError::ConfigLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    compile_config(def).map_err(|e| ItrxError::ConfigLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Parse a form configuration from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<FormConfig, ItrxError> {
    let def: FormConfigDef = serde_json::from_str(json).map_err(ItrxError::Json)?;
    compile_config(def)
}

/// Validate a configuration definition and compile its patterns.
pub fn compile_config(def: FormConfigDef) -> Result<FormConfig, ItrxError> {
    if def.sections.is_empty() {
        return Err(ItrxError::ConfigInvalid(
            "configuration must define at least one section".into(),
        ));
    }

    let sections = def
        .sections
        .iter()
        .map(|(name, section)| compile_section(name, section))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FormConfig { sections })
}

fn compile_section(name: &str, def: &SectionDef) -> Result<SectionSpec, ItrxError> {
    if name.trim().is_empty() {
        return Err(ItrxError::ConfigInvalid(
            "section name must not be empty".into(),
        ));
    }

    if def.start_pattern.trim().is_empty() {
        return Err(ItrxError::ConfigInvalid(format!(
            "section '{}' has an empty start_pattern",
            name
        )));
    }
    let start = compile_pattern(name, "start_pattern", &def.start_pattern)?;

    let end = match def.end_pattern.as_deref().map(str::trim) {
        None | Some("") => EndCondition::Absent,
        Some(EMPTY_ROW_SENTINEL) => EndCondition::EmptyRow,
        Some(pattern) => EndCondition::Pattern(compile_pattern(name, "end_pattern", pattern)?),
    };

    let header_markers = match &def.header_markers {
        Some(markers) if !markers.is_empty() => markers.iter().map(|m| m.trim().to_string()).collect(),
        _ => vec![DEFAULT_HEADER_MARKER.to_string()],
    };

    let header_rename = def
        .header_rename
        .iter()
        .map(|(raw, label)| (raw.trim().to_string(), label.clone()))
        .collect();

    Ok(SectionSpec {
        name: name.to_string(),
        start,
        header_markers,
        end,
        header_rename,
        indentation_skip: def.indentation_skip.unwrap_or(0),
    })
}

fn compile_pattern(section: &str, field: &str, pattern: &str) -> Result<Regex, ItrxError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            ItrxError::ConfigInvalid(format!(
                "section '{}' has an invalid {}: {}",
                section, field, e
            ))
        })
}

/// Map form keys to configuration files found in `dir`.
///
/// `ITR1_header.json` is offered as `ITR1`. Keys are returned sorted.
pub fn discover_configs(dir: &Path) -> Result<BTreeMap<String, PathBuf>, ItrxError> {
    let mut found = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let lower = file_name.to_lowercase();
        if lower.ends_with(CONFIG_FILE_SUFFIX) && path.is_file() {
            let key = &file_name[..file_name.len() - CONFIG_FILE_SUFFIX.len()];
            if !key.is_empty() {
                found.insert(key.to_string(), path.clone());
            }
        }
    }
    Ok(found)
}
