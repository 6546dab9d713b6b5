use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::GenerationError;

/// Writer for one model's rendering, with the file path when there is one.
pub struct OutputTarget {
    pub path: Option<PathBuf>,
    pub writer: Box<dyn Write>,
}

/// Where rendered stores are persisted.
pub trait Destination {
    fn open(&mut self, model: &str, extension: &str) -> Result<OutputTarget, GenerationError>;
}

/// Writes every model to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDestination;

impl Destination for ConsoleDestination {
    fn open(&mut self, _model: &str, _extension: &str) -> Result<OutputTarget, GenerationError> {
        Ok(OutputTarget {
            path: None,
            writer: Box::new(io::stdout()),
        })
    }
}

/// Writes `<model>.<extension>` files into a directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct DirectoryDestination {
    dir: PathBuf,
}

impl DirectoryDestination {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Destination for DirectoryDestination {
    fn open(&mut self, model: &str, extension: &str) -> Result<OutputTarget, GenerationError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{model}.{extension}"));
        let file = File::create(&path)?;
        Ok(OutputTarget {
            path: Some(path),
            writer: Box::new(BufWriter::new(file)),
        })
    }
}
