//! Generation engine for fakeit.
//!
//! This crate compiles model declarations into schema trees bound to the
//! generator catalogue, runs them phase by phase in dependency order and
//! renders the resulting stores through the output pipeline.

pub mod cancel;
pub mod compile;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod input;
pub mod model;
pub mod output;
pub mod params;
pub mod sampling;
pub mod store;

pub use cancel::CancellationToken;
pub use compile::compile_models;
pub use engine::{GenerationEngine, GenerationResult};
pub use errors::GenerationError;
pub use generators::{Generator, GeneratorRegistry};
pub use input::{FsInputLoader, InputError, InputLoader, MemoryInputLoader};
pub use model::{
    DocumentFailure, GenerateOptions, GenerationIssue, GenerationReport, ModelReport, ModelStatus,
};
pub use output::{
    ConsoleDestination, Destination, DirectoryDestination, Formatter, OutputFile, OutputFormat,
    write_outputs,
};
pub use store::{GeneratedStore, StoreBuilder};
