//! Model declarations, registry and resolution for fakeit.
//!
//! Models are authored as YAML or JSON files, validated against the emitted
//! JSON Schema and semantic rules, and turned into immutable [`ModelSpec`]s
//! held by a [`ModelRegistry`] that computes the generation order.

pub mod errors;
pub mod load;
pub mod model;
pub mod registry;
pub mod sampling;
pub mod schema;
pub mod spec;
pub mod validate;

pub use errors::{IssueSeverity, ModelError, Result, ValidationIssue, ValidationReport};
pub use load::{ModelSource, load_model_sources, load_models, parse_model_source};
pub use model::{
    ArrayDecl, BaseDecl, CountDecl, DependencyBinding, InputBinding, ModelDecl, ModelFile,
    NodeDecl, ObjectDecl,
};
pub use registry::{ModelRegistry, ResolvedOrder};
pub use sampling::{Attachment, InputOverflow, MAX_SAMPLE, Rounding, SamplePolicy};
pub use schema::model_json_schema;
pub use spec::{ModelSpec, ModelSpecBuilder};
pub use validate::{
    ValidatedModels, validate_declarations, validate_generators, validate_model_json,
    validate_models,
};
