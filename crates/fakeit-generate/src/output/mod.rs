//! Output pipeline: a [`Formatter`] renders stores, a [`Destination`]
//! decides where the bytes go.

use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::GenerationError;
use crate::store::GeneratedStore;

pub mod csv;
mod destination;
pub mod json;

pub use destination::{ConsoleDestination, Destination, DirectoryDestination, OutputTarget};

/// Serializes one model's store.
pub trait Formatter: Send + Sync {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn format(&self, store: &GeneratedStore, out: &mut dyn Write) -> Result<(), GenerationError>;
}

/// Built-in formatters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Ndjson,
    Csv,
}

impl OutputFormat {
    pub fn formatter(self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Json => Box::new(json::JsonFormatter),
            OutputFormat::Ndjson => Box::new(json::NdjsonFormatter),
            OutputFormat::Csv => Box::new(csv::CsvFormatter),
        }
    }
}

/// What was written for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub documents: usize,
    pub bytes: u64,
}

/// Render every store, in the given order, through `formatter` into `destination`.
pub fn write_outputs(
    stores: &[GeneratedStore],
    formatter: &dyn Formatter,
    destination: &mut dyn Destination,
) -> Result<Vec<OutputFile>, GenerationError> {
    let mut written = Vec::with_capacity(stores.len());
    for store in stores {
        let target = destination.open(store.model(), formatter.extension())?;
        let mut counting = CountingWriter::new(target.writer);
        formatter.format(store, &mut counting)?;
        counting.flush()?;
        info!(
            model = %store.model(),
            documents = store.len(),
            bytes = counting.bytes_written(),
            "output written"
        );
        written.push(OutputFile {
            model: store.model().to_string(),
            path: target.path,
            documents: store.len(),
            bytes: counting.bytes_written(),
        });
    }
    Ok(written)
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
