use itrx_core::batch::BatchResult;
use itrx_core::config::FormConfig;
use itrx_core::document::DocumentParser;
use itrx_core::error::ItrxError;
use itrx_core::metadata::MetadataPatterns;
use std::path::Path;

use crate::output;
use crate::{BatchArgs, FormArgs};

pub fn run(dir: &Path, form: &FormArgs, batch: &BatchArgs, output_format: &str) -> Result<(), ItrxError> {
    let config = super::load_form(form)?;
    let result = process_dir(dir, &config, form, batch)?;

    match output_format {
        "json" => output::json::print(&result)?,
        _ => output::table::print_batch(&result),
    }

    Ok(())
}

/// Process every source document in `dir` with the selected backend.
pub fn process_dir(
    dir: &Path,
    config: &FormConfig,
    form: &FormArgs,
    batch: &BatchArgs,
) -> Result<BatchResult, ItrxError> {
    let parser = DocumentParser::new(config).with_patterns(MetadataPatterns::for_anchor(form.taxpayer_anchor));
    let extractor = super::extractor(&batch.source);

    itrx_core::process_all(dir, parser, super::batch_options(batch), extractor.as_ref())
}
