use crate::error::ItrxError;
use crate::export::zip_error;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Default archive name for a directory of per-taxpayer workbooks.
pub const DEFAULT_BUNDLE_NAME: &str = "ITR_by_PAN.zip";

/// An in-memory zip of workbooks.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub bytes: Vec<u8>,
    pub count: usize,
}

/// Workbooks directly inside `dir`, sorted by file name.
pub fn workbook_files(dir: &Path) -> Result<Vec<PathBuf>, ItrxError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if is_xlsx && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Zip every workbook in `dir`. Returns `None` when there is nothing to bundle.
pub fn bundle_workbooks(dir: &Path) -> Result<Option<Bundle>, ItrxError> {
    let files = workbook_files(dir)?;
    if files.is_empty() {
        return Ok(None);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options).map_err(zip_error)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    let cursor = zip.finish().map_err(zip_error)?;

    Ok(Some(Bundle {
        bytes: cursor.into_inner(),
        count: files.len(),
    }))
}

/// Bundle `dir` into `dest`. Returns the number of workbooks archived.
pub fn write_bundle(dir: &Path, dest: &Path) -> Result<usize, ItrxError> {
    match bundle_workbooks(dir)? {
        Some(bundle) => {
            std::fs::write(dest, &bundle.bytes)?;
            tracing::info!(path = %dest.display(), workbooks = bundle.count, "bundle written");
            Ok(bundle.count)
        }
        None => Ok(0),
    }
}
