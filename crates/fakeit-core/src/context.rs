use std::collections::BTreeMap;

use rand::RngCore;
use serde_json::{Map, Value};

use crate::error::{CapabilityError, SchemaGenerationError};
use crate::path::NodePath;

/// Sampled input rows keyed by input name.
pub type InputRows = BTreeMap<String, Vec<Value>>;

/// Dependency documents attached to one document, keyed by model name.
pub type AttachedDocuments<'a> = BTreeMap<String, Vec<&'a Value>>;

static NO_INPUTS: InputRows = BTreeMap::new();
static NO_DEPENDENCIES: AttachedDocuments<'static> = BTreeMap::new();

/// State visible to node capabilities while a single document is built.
///
/// The context is created fresh for every document. Inputs and dependency
/// documents are read-only snapshots; the only mutable parts are the RNG,
/// the stack of objects under construction and the current node path.
pub struct GenerationContext<'a> {
    model: &'a str,
    key: Option<&'a str>,
    index: u64,
    inputs: &'a InputRows,
    dependencies: &'a AttachedDocuments<'a>,
    rng: &'a mut dyn RngCore,
    scopes: Vec<Map<String, Value>>,
    path: NodePath,
}

impl<'a> GenerationContext<'a> {
    pub fn new(model: &'a str, index: u64, rng: &'a mut dyn RngCore) -> Self {
        Self {
            model,
            key: None,
            index,
            inputs: &NO_INPUTS,
            dependencies: &NO_DEPENDENCIES,
            rng,
            scopes: Vec::new(),
            path: NodePath::root(),
        }
    }

    pub fn with_key(mut self, key: Option<&'a str>) -> Self {
        self.key = key;
        self
    }

    pub fn with_inputs(mut self, inputs: &'a InputRows) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_dependencies(mut self, dependencies: &'a AttachedDocuments<'a>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn model(&self) -> &'a str {
        self.model
    }

    pub fn key(&self) -> Option<&'a str> {
        self.key
    }

    /// Position of the document being built within its model batch.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Rows of a bound input, as sampled for the current model phase.
    pub fn input(&self, name: &str) -> Result<&'a [Value], CapabilityError> {
        let inputs: &'a InputRows = self.inputs;
        inputs
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CapabilityError::UnknownInput(name.to_string()))
    }

    /// Documents of a dependency model attached to the current document.
    pub fn dependency(&self, model: &str) -> Result<&'a [&'a Value], CapabilityError> {
        let dependencies: &'a AttachedDocuments<'a> = self.dependencies;
        dependencies
            .get(model)
            .map(Vec::as_slice)
            .ok_or_else(|| CapabilityError::UnknownDependency(model.to_string()))
    }

    /// Field already generated in the innermost object under construction.
    pub fn sibling(&self, field: &str) -> Option<&Value> {
        self.scopes.last().and_then(|scope| scope.get(field))
    }

    /// Fields generated so far for the top-level document.
    pub fn document(&self) -> Option<&Map<String, Value>> {
        self.scopes.first()
    }

    pub(crate) fn path_mut(&mut self) -> &mut NodePath {
        &mut self.path
    }

    pub(crate) fn enter_scope(&mut self) {
        self.scopes.push(Map::new());
    }

    pub(crate) fn exit_scope(&mut self) -> Map<String, Value> {
        self.scopes.pop().unwrap_or_default()
    }

    pub(crate) fn insert_field(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub(crate) fn error(&self, source: CapabilityError) -> SchemaGenerationError {
        SchemaGenerationError {
            model: self.model.to_string(),
            index: self.index,
            path: self.path.clone(),
            source,
        }
    }
}
