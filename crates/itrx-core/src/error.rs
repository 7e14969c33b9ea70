use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ItrxError {
    #[error("failed to load form configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid form configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to read source document '{file}': {reason}")]
    SourceRead { file: String, reason: String },

    #[error("table extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("table extraction timed out after {seconds}s")]
    ExtractionTimeout { seconds: u64 },

    #[error("no recognizable tables found in document")]
    NoTables,

    #[error("failed to write workbook for taxpayer '{taxpayer_id}': {reason}")]
    ExportWrite { taxpayer_id: String, reason: String },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
