use itrx_core::error::ItrxError;
use itrx_core::export::bundle::write_bundle;
use itrx_core::export::xlsx::XlsxWriter;
use itrx_core::export::WidthPolicy;
use std::path::{Path, PathBuf};

use crate::output;
use crate::{BatchArgs, FormArgs};

pub fn run(
    dir: &Path,
    form: &FormArgs,
    batch: &BatchArgs,
    out: Option<PathBuf>,
    policy: WidthPolicy,
    bundle_name: Option<String>,
) -> Result<(), ItrxError> {
    let config = super::load_form(form)?;
    let result = super::process::process_dir(dir, &config, form, batch)?;
    for (file, reason) in &result.errors {
        eprintln!("  skipped {file}: {reason}");
    }

    let out_dir = out.unwrap_or_else(|| dir.to_path_buf());
    let report = itrx_core::export_by_taxpayer(&result, &config, &out_dir, policy, &XlsxWriter)?;
    output::table::print_export_report(&report);

    if let Some(name) = bundle_name {
        let dest = out_dir.join(name);
        let count = write_bundle(&out_dir, &dest)?;
        if count == 0 {
            eprintln!("No workbooks to bundle in {}", out_dir.display());
        } else {
            eprintln!("Bundled {count} workbook(s) into {}", dest.display());
        }
    }

    if report.written.is_empty() && !report.failed.is_empty() {
        return Err(ItrxError::ExportWrite {
            taxpayer_id: report.failed.keys().cloned().collect::<Vec<_>>().join(", "),
            reason: "no workbook could be written".into(),
        });
    }

    Ok(())
}
