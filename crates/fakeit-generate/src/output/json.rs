use std::io::Write;

use crate::errors::GenerationError;
use crate::output::Formatter;
use crate::store::GeneratedStore;

/// Pretty-printed JSON array per model.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn format(&self, store: &GeneratedStore, out: &mut dyn Write) -> Result<(), GenerationError> {
        serde_json::to_writer_pretty(&mut *out, store.documents())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// One compact JSON document per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonFormatter;

impl Formatter for NdjsonFormatter {
    fn extension(&self) -> &'static str {
        "ndjson"
    }

    fn format(&self, store: &GeneratedStore, out: &mut dyn Write) -> Result<(), GenerationError> {
        for document in store.iter() {
            serde_json::to_writer(&mut *out, document)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}
