//! Core contracts for fakeit.
//!
//! This crate defines the schema node tree that describes one generated
//! document, the context handed to node capabilities while a document is
//! built, and the dependency graph used to order model generation.

pub mod context;
pub mod error;
pub mod graph;
pub mod path;
pub mod schema;

pub use context::{AttachedDocuments, GenerationContext, InputRows};
pub use error::{CapabilityError, Error, Result, SchemaGenerationError};
pub use graph::{DependencyGraph, GraphReport, GraphSummary};
pub use path::{NodePath, PathSegment};
pub use schema::{Capability, FnCapability, NodeKind, Repeat, SchemaNode, capability_fn};
