use std::collections::HashMap;
use std::sync::Arc;

use fakeit_core::DependencyGraph;

use crate::errors::{ModelError, Result};
use crate::spec::ModelSpec;

/// Generation order together with the graph it was computed from.
#[derive(Debug, Clone)]
pub struct ResolvedOrder {
    pub order: Vec<Arc<ModelSpec>>,
    pub graph: DependencyGraph,
}

impl ResolvedOrder {
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|spec| spec.name()).collect()
    }
}

/// Declared models, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<ModelSpec>>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ModelSpec) -> Result<Arc<ModelSpec>> {
        if self.index.contains_key(spec.name()) {
            return Err(ModelError::DuplicateModel(spec.name().to_string()));
        }
        let spec = Arc::new(spec);
        self.index.insert(spec.name().to_string(), self.models.len());
        self.models.push(Arc::clone(&spec));
        Ok(spec)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<ModelSpec>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel {
                name: name.to_string(),
                referenced_by: None,
            })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelSpec>> {
        self.index.get(name).map(|idx| &self.models[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelSpec>> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Dependency graph over every registered model.
    pub fn graph(&self) -> Result<DependencyGraph> {
        let graph = DependencyGraph::build(
            self.models
                .iter()
                .map(|spec| (spec.name(), spec.dependency_names())),
        )?;
        Ok(graph)
    }

    /// Order in which every model follows all of its dependencies.
    pub fn resolve_order(&self) -> Result<ResolvedOrder> {
        let graph = self.graph()?;
        let order = graph
            .topo_order()?
            .iter()
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedOrder { order, graph })
    }
}
