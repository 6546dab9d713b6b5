use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use fakeit_model::SamplePolicy;

use crate::sampling::sample_rows;

/// Failure while materializing an input source.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input source '{0}' not found")]
    NotFound(String),
    #[error("input source '{input}' is malformed: {message}")]
    Malformed { input: String, message: String },
}

impl InputError {
    fn malformed(input: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

/// Source of raw rows for model inputs.
pub trait InputLoader: Send + Sync {
    /// Every row of `source`, in source order.
    fn load(&self, source: &str) -> Result<Vec<Value>, InputError>;

    /// Rows of `source` reduced (or repeated) according to `sample` and `policy`.
    fn load_sampled(
        &self,
        source: &str,
        sample: Option<f64>,
        policy: &SamplePolicy,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Value>, InputError> {
        let rows = self.load(source)?;
        Ok(sample_rows(rows, sample, policy, rng))
    }
}

/// Reads input files relative to a root directory.
///
/// `.csv` files need a header row; cells become strings unless they parse as
/// integers, floats or booleans. `.json` holds an array, `.ndjson` / `.jsonl`
/// one value per line.
#[derive(Debug, Clone)]
pub struct FsInputLoader {
    root: PathBuf,
}

impl FsInputLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InputLoader for FsInputLoader {
    fn load(&self, source: &str) -> Result<Vec<Value>, InputError> {
        let path = self.root.join(source);
        if !path.is_file() {
            return Err(InputError::NotFound(source.to_string()));
        }
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => read_csv(source, &path),
            "json" => read_json(source, &path),
            "ndjson" | "jsonl" => read_ndjson(source, &path),
            other => Err(InputError::malformed(
                source,
                format!("unsupported input format '{other}'"),
            )),
        }
    }
}

/// Inputs held in memory, keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct MemoryInputLoader {
    sources: HashMap<String, Vec<Value>>,
}

impl MemoryInputLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>, rows: Vec<Value>) -> Self {
        self.insert(source, rows);
        self
    }

    pub fn insert(&mut self, source: impl Into<String>, rows: Vec<Value>) {
        self.sources.insert(source.into(), rows);
    }
}

impl InputLoader for MemoryInputLoader {
    fn load(&self, source: &str) -> Result<Vec<Value>, InputError> {
        self.sources
            .get(source)
            .cloned()
            .ok_or_else(|| InputError::NotFound(source.to_string()))
    }
}

fn read_csv(source: &str, path: &Path) -> Result<Vec<Value>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|_| InputError::NotFound(source.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|err| InputError::malformed(source, err.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| InputError::malformed(source, err.to_string()))?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

fn read_json(source: &str, path: &Path) -> Result<Vec<Value>, InputError> {
    let contents = read_to_string(source, path)?;
    match serde_json::from_str(&contents) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(_) => Err(InputError::malformed(source, "expected a JSON array")),
        Err(err) => Err(InputError::malformed(source, err.to_string())),
    }
}

fn read_ndjson(source: &str, path: &Path) -> Result<Vec<Value>, InputError> {
    let contents = read_to_string(source, path)?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|err| InputError::malformed(source, format!("line {}: {err}", idx + 1)))
        })
        .collect()
}

fn read_to_string(source: &str, path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|_| InputError::NotFound(source.to_string()))
}

fn infer_cell(cell: &str) -> Value {
    if let Ok(value) = cell.parse::<i64>() {
        return Value::Number(value.into());
    }
    if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
