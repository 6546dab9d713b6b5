use std::io::Write;

use serde_json::Value;

use crate::errors::GenerationError;
use crate::output::Formatter;
use crate::store::GeneratedStore;

/// Flattens top-level fields into CSV columns.
///
/// Columns follow first appearance across documents. Nested arrays and
/// objects are written as compact JSON text, missing fields and nulls as
/// empty cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn format(&self, store: &GeneratedStore, out: &mut dyn Write) -> Result<(), GenerationError> {
        let columns = columns(store);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(&columns)?;
        for document in store.iter() {
            let record: Vec<String> = columns
                .iter()
                .map(|column| document.get(column).map(cell).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn columns(store: &GeneratedStore) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for document in store.iter() {
        if let Value::Object(fields) = document {
            for name in fields.keys() {
                if !columns.iter().any(|column| column == name) {
                    columns.push(name.clone());
                }
            }
        }
    }
    columns
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
