use thiserror::Error;

use crate::path::NodePath;

/// Core error type shared across fakeit crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A schema tree violates its construction invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The same graph node was declared twice.
    #[error("duplicate node '{0}'")]
    DuplicateNode(String),
    /// An edge points at a node that was never declared.
    #[error("'{from}' depends on unknown node '{missing}'")]
    UnknownNode { from: String, missing: String },
    /// The graph contains a cycle. The path starts and ends on the same node.
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Convenience alias for results returned by fakeit-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a node capability while producing a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("unknown input '{0}'")]
    UnknownInput(String),
    #[error("unknown dependency '{0}'")]
    UnknownDependency(String),
    #[error("field '{0}' is not available")]
    MissingField(String),
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A single document failed to generate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{model}[{index}] at {path}: {source}")]
pub struct SchemaGenerationError {
    pub model: String,
    pub index: u64,
    pub path: NodePath,
    pub source: CapabilityError,
}
