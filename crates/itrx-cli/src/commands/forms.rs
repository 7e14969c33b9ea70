use itrx_core::config::builtin::{load_preset, PRESETS};
use itrx_core::config::{discover_configs, load_config, EndCondition, FormConfig};
use itrx_core::error::ItrxError;
use std::path::Path;

pub fn list() -> Result<(), ItrxError> {
    println!("Predefined forms:\n");
    for name in PRESETS {
        let config = load_preset(name)?;
        println!("  {:<8} {} section(s)", name, config.sections().len());
    }
    println!("\nUse `itrx forms explain <FORM>` for details.");
    Ok(())
}

pub fn explain(form: &str) -> Result<(), ItrxError> {
    let config = load_preset(form)?;
    println!("=== {} ===\n", form.to_uppercase());
    describe(&config);
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), ItrxError> {
    let config = load_config(file)?;
    println!("Valid: {} section(s)\n", config.sections().len());
    describe(&config);
    Ok(())
}

pub fn discover(dir: &Path) -> Result<(), ItrxError> {
    let found = discover_configs(dir)?;
    if found.is_empty() {
        println!("No *_header.json files in {}", dir.display());
        return Ok(());
    }

    let width = found.keys().map(String::len).max().unwrap_or(4);
    for (key, path) in &found {
        let status = match load_config(path) {
            Ok(config) => format!("{} section(s)", config.sections().len()),
            Err(e) => format!("invalid: {e}"),
        };
        println!("  {:<width$}  {}  ({})", key, path.display(), status, width = width);
    }
    Ok(())
}

fn describe(config: &FormConfig) {
    for (i, section) in config.sections().iter().enumerate() {
        println!("{}. {}", i + 1, section.name);
        println!("   starts at:  /{}/", section.start.as_str());
        println!("   header row: {}", section.header_markers.join(" | "));
        let end = match &section.end {
            EndCondition::Pattern(re) => format!("/{}/", re.as_str()),
            EndCondition::EmptyRow => "first empty row".to_string(),
            EndCondition::Absent => "never (section is not emitted)".to_string(),
        };
        println!("   ends at:    {end}");
        if section.indentation_skip > 0 {
            println!("   skips:      {} leading row(s)", section.indentation_skip);
        }
        for (raw, label) in &section.header_rename {
            println!("   rename:     {raw} -> {label}");
        }
        println!();
    }
}
