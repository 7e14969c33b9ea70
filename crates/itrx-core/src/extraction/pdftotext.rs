use crate::error::ItrxError;
use crate::extraction::table::page_table_from_layout;
use crate::extraction::{ExtractedTable, TableExtractor};
use std::io::Write;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::warn;

/// Default wall-clock limit for one document.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Table extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -layout` to preserve whitespace alignment of tables, then
/// rebuilds each page's rows from the aligned text.
pub struct PdftotextExtractor {
    timeout: Duration,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor for PdftotextExtractor {
    fn extract_rows(&self, pdf_bytes: &[u8]) -> Result<ExtractedTable, ItrxError> {
        let mut input =
            tempfile::NamedTempFile::new().map_err(|e| ItrxError::Extraction(e.to_string()))?;
        input
            .write_all(pdf_bytes)
            .map_err(|e| ItrxError::Extraction(e.to_string()))?;
        let output =
            tempfile::NamedTempFile::new().map_err(|e| ItrxError::Extraction(e.to_string()))?;
        let stderr_file =
            tempfile::NamedTempFile::new().map_err(|e| ItrxError::Extraction(e.to_string()))?;

        // Output goes to files, not pipes, so a slow child can be polled
        // without its pipe buffers filling up.
        let child = Command::new("pdftotext")
            .arg("-layout")
            .arg(input.path())
            .arg(output.path())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file.reopen()?))
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ItrxError::PdftotextNotFound
                } else {
                    ItrxError::Extraction(format!("pdftotext failed: {}", e))
                }
            })?;

        let status = wait_with_timeout(child, self.timeout)?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let stderr = std::fs::read(stderr_file.path())
                .map(|b| String::from_utf8_lossy(&b).trim().to_string())
                .unwrap_or_default();
            return Err(ItrxError::PdftotextFailed { code, stderr });
        }

        let bytes = std::fs::read(output.path())?;
        let text = String::from_utf8_lossy(&bytes);
        let table = table_from_layout_text(&text);

        if table.row_count() == 0 {
            return Err(ItrxError::NoTables);
        }
        Ok(table)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Split layout text into pages (pdftotext uses form feed \x0c as page
/// separator) and rebuild each page's table.
pub fn table_from_layout_text(text: &str) -> ExtractedTable {
    let mut page_texts: Vec<&str> = text.split('\x0c').collect();
    // pdftotext terminates the last page with a form feed too
    if page_texts.len() > 1 && page_texts.last().is_some_and(|p| p.trim().is_empty()) {
        page_texts.pop();
    }

    let pages = page_texts
        .into_iter()
        .enumerate()
        .map(|(i, page_text)| page_table_from_layout(i + 1, page_text))
        .collect();

    ExtractedTable { pages }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ExitStatus, ItrxError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() > timeout {
            warn!(timeout_secs = timeout.as_secs(), "pdftotext timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ItrxError::ExtractionTimeout {
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
