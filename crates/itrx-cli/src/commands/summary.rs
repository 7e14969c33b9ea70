use itrx_core::error::ItrxError;
use std::path::Path;

use crate::output;
use crate::{BatchArgs, FormArgs};

pub fn run(dir: &Path, form: &FormArgs, batch: &BatchArgs, output_format: &str) -> Result<(), ItrxError> {
    let config = super::load_form(form)?;
    let result = super::process::process_dir(dir, &config, form, batch)?;
    let summary = itrx_core::summarize(&result);

    match output_format {
        "json" => output::json::print(&summary)?,
        _ => output::table::print_summary(&summary),
    }

    if !result.errors.is_empty() {
        eprintln!("{} document(s) failed; run `itrx process` for details", result.errors.len());
    }

    Ok(())
}
