use crate::document::DocumentParser;
use crate::error::ItrxError;
use crate::extraction::pdftotext::DEFAULT_TIMEOUT;
use crate::extraction::TableExtractor;
use crate::model::ParsedDocument;
use crate::summary::{summarize, SummaryRow};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Suffix of the trace artifact written next to each source document.
pub const TRACE_SUFFIX: &str = "_extracted.txt";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Documents parsed concurrently.
    pub workers: usize,
    /// Wall-clock limit for extracting one document.
    pub timeout: Duration,
    /// Write `<stem>_extracted.txt` next to each source document.
    pub write_traces: bool,
    /// Source file extension, matched case-insensitively.
    pub extension: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: DEFAULT_TIMEOUT,
            write_traces: false,
            extension: "pdf".into(),
        }
    }
}

/// Parsed documents by key, and failures by source file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub documents: BTreeMap<String, ParsedDocument>,
    pub errors: BTreeMap<String, String>,
}

impl BatchResult {
    /// Summary rows in `(taxpayer id, filing date)` order.
    pub fn summary(&self) -> Vec<SummaryRow<'_>> {
        summarize(self.documents.iter().map(|(k, d)| (k.as_str(), d)))
    }

    pub fn document(&self, key: &str) -> Option<&ParsedDocument> {
        self.documents.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.errors.is_empty()
    }

    /// Store a document under its key. A document already stored under the
    /// same key is replaced.
    fn insert(&mut self, document: ParsedDocument) {
        let key = document.key().to_string();
        if let Some(previous) = self.documents.get(&key) {
            debug!(
                key = %key,
                replaced = %previous.source_name,
                by = %document.source_name,
                "document key collision"
            );
        }
        self.documents.insert(key, document);
    }
}

/// Parses every source document in a directory, isolating failures.
pub struct BatchProcessor<'a> {
    dir: PathBuf,
    parser: DocumentParser<'a>,
    options: BatchOptions,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(dir: impl Into<PathBuf>, parser: DocumentParser<'a>, options: BatchOptions) -> Self {
        Self {
            dir: dir.into(),
            parser,
            options,
        }
    }

    /// Source documents in the directory, sorted by file name.
    pub fn source_files(&self) -> Result<Vec<PathBuf>, ItrxError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.options.extension));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Parse every source document.
    ///
    /// Documents are parsed on a worker pool; results are merged in file
    /// name order afterwards, so a later file wins a key collision. Only a
    /// missing directory or a pool that cannot start fails the batch.
    pub fn process_all(&self, extractor: &dyn TableExtractor) -> Result<BatchResult, ItrxError> {
        let files = self.source_files()?;
        let workers = self.options.workers.max(1);
        info!(
            dir = %self.dir.display(),
            files = files.len(),
            workers,
            backend = extractor.backend_name(),
            "processing batch"
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ItrxError::WorkerPool(e.to_string()))?;

        let outcomes: Vec<(String, Result<ParsedDocument, ItrxError>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let name = file_name(path);
                    let outcome = self.process_one(path, &name, extractor);
                    (name, outcome)
                })
                .collect()
        });

        let mut result = BatchResult::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(document) => result.insert(document),
                Err(e) => {
                    warn!(file = %name, error = %e, "document failed");
                    result.errors.insert(name, e.to_string());
                }
            }
        }

        info!(
            parsed = result.documents.len(),
            failed = result.errors.len(),
            "batch finished"
        );
        Ok(result)
    }

    fn process_one(
        &self,
        path: &Path,
        name: &str,
        extractor: &dyn TableExtractor,
    ) -> Result<ParsedDocument, ItrxError> {
        let bytes = std::fs::read(path).map_err(|e| ItrxError::SourceRead {
            file: name.to_string(),
            reason: e.to_string(),
        })?;
        let table = extractor.extract_rows(&bytes)?;

        if self.options.write_traces {
            let trace_path = trace_path(path);
            if let Err(e) = std::fs::write(&trace_path, table.render_trace(name)) {
                warn!(path = %trace_path.display(), error = %e, "failed to write trace");
            }
        }

        let document = self.parser.parse_extracted(name, table);
        debug!(
            file = %name,
            key = document.key(),
            sections = document.sections.len(),
            "document parsed"
        );
        Ok(document)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `dir/return.pdf` -> `dir/return_extracted.txt`.
pub fn trace_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{TRACE_SUFFIX}"))
}
