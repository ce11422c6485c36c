//! Durable crawl output
//!
//! The metadata CSV has exactly one writer: a blocking task that owns the file
//! and receives rows over a channel. In-flight paper fetches only hold a
//! cloneable [`SinkHandle`], so concurrent appends can never interleave.

use crate::output::PaperRecord;
use crate::{HarvestError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Header line of the metadata CSV, written unquoted
pub const CSV_HEADER: &str = "Year,Title,Authors,Paper Link,PDF Link";

/// What the writer task did over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Rows written and flushed
    pub written: u64,

    /// Rows that could not be written
    pub failed: u64,
}

/// Owner of the metadata CSV writer task
pub struct PaperSink {
    path: PathBuf,
    tx: UnboundedSender<PaperRecord>,
    writer: JoinHandle<SinkReport>,
}

/// Cloneable handle used to append rows
#[derive(Debug, Clone)]
pub struct SinkHandle {
    tx: UnboundedSender<PaperRecord>,
}

impl SinkHandle {
    /// Queues one row for the writer task
    pub fn append(&self, record: PaperRecord) -> Result<()> {
        self.tx
            .send(record)
            .map_err(|e| HarvestError::Sink(format!("writer has shut down, dropped {:?}", e.0.title)))
    }
}

impl PaperSink {
    /// Truncates `path`, writes the header and starts the writer task
    ///
    /// Must be called from within a Tokio runtime. An unwritable path is an
    /// error: the crawl cannot proceed without its output.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "{}", CSV_HEADER)?;
        file.flush()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::task::spawn_blocking(move || write_rows(file, rx));

        tracing::debug!("Initialized {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            tx,
            writer,
        })
    }

    /// Path of the CSV being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a new handle for appending rows
    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            tx: self.tx.clone(),
        }
    }

    /// Closes the channel and waits for queued rows to be written
    ///
    /// Every [`SinkHandle`] must have been dropped first, otherwise this waits
    /// for them.
    pub async fn finish(self) -> Result<SinkReport> {
        drop(self.tx);
        Ok(self.writer.await?)
    }
}

/// Writer task body: one quoted CSV row per record, flushed immediately
fn write_rows(file: File, mut rx: UnboundedReceiver<PaperRecord>) -> SinkReport {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    let mut report = SinkReport::default();
    while let Some(record) = rx.blocking_recv() {
        let result = writer
            .write_record(record.to_row())
            .and_then(|_| writer.flush().map_err(csv::Error::from));

        match result {
            Ok(()) => report.written += 1,
            Err(e) => {
                tracing::error!("Failed to record {:?}: {}", record.title, e);
                report.failed += 1;
            }
        }
    }

    report
}
