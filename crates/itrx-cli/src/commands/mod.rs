pub mod export;
pub mod forms;
pub mod parse;
pub mod process;
pub mod summary;

use itrx_core::batch::BatchOptions;
use itrx_core::config::builtin::load_preset;
use itrx_core::config::{load_config, FormConfig};
use itrx_core::error::ItrxError;
use itrx_core::extraction::json_rows::JsonRowsExtractor;
use itrx_core::extraction::pdftotext::PdftotextExtractor;
use itrx_core::extraction::TableExtractor;
use std::time::Duration;

use crate::{BatchArgs, FormArgs, SourceArgs};

/// The custom config file if given, otherwise the named preset.
pub fn load_form(args: &FormArgs) -> Result<FormConfig, ItrxError> {
    match &args.config {
        Some(path) => load_config(path),
        None => load_preset(&args.form),
    }
}

pub fn extractor(args: &SourceArgs) -> Box<dyn TableExtractor> {
    if args.rows_json {
        Box::new(JsonRowsExtractor)
    } else {
        Box::new(PdftotextExtractor::with_timeout(Duration::from_secs(
            args.timeout_secs,
        )))
    }
}

pub fn batch_options(args: &BatchArgs) -> BatchOptions {
    let mut options = BatchOptions {
        timeout: Duration::from_secs(args.source.timeout_secs),
        write_traces: args.traces,
        ..BatchOptions::default()
    };
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }
    if args.source.rows_json {
        options.extension = "json".into();
    }
    options
}
