use crate::config::{parse_config_str, FormConfig};
use crate::error::ItrxError;

const ITR1_HEADER_JSON: &str = include_str!("../../../../configs/ITR1_header.json");

/// Available predefined form configurations.
pub const PRESETS: &[&str] = &["ITR1"];

/// Load a predefined form configuration by name (case-insensitive).
pub fn load_preset(name: &str) -> Result<FormConfig, ItrxError> {
    match name.to_uppercase().as_str() {
        "ITR1" => parse_config_str(ITR1_HEADER_JSON),
        _ => Err(ItrxError::ConfigInvalid(format!(
            "unknown form '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}
