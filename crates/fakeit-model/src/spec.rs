use std::collections::HashSet;

use fakeit_core::SchemaNode;

use crate::errors::{ModelError, Result};
use crate::model::{DependencyBinding, InputBinding};
use crate::sampling::MAX_SAMPLE;

/// One validated model, immutable once built.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    count: u64,
    key: Option<String>,
    seed: Option<u64>,
    inputs: Vec<InputBinding>,
    dependencies: Vec<DependencyBinding>,
    schema: SchemaNode,
}

impl ModelSpec {
    pub fn builder(name: impl Into<String>) -> ModelSpecBuilder {
        ModelSpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    pub fn dependencies(&self) -> &[DependencyBinding] {
        &self.dependencies
    }

    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|dep| dep.model.as_str())
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }
}

/// Builder for [`ModelSpec`]; every rule is checked in [`ModelSpecBuilder::build`].
#[derive(Debug)]
pub struct ModelSpecBuilder {
    name: String,
    count: u64,
    key: Option<String>,
    seed: Option<u64>,
    inputs: Vec<InputBinding>,
    dependencies: Vec<DependencyBinding>,
    schema: Option<SchemaNode>,
}

impl ModelSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 1,
            key: None,
            seed: None,
            inputs: Vec::new(),
            dependencies: Vec::new(),
            schema: None,
        }
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn input(mut self, binding: InputBinding) -> Self {
        self.inputs.push(binding);
        self
    }

    pub fn input_source(self, source: impl Into<String>, sample: Option<f64>) -> Self {
        self.input(InputBinding {
            source: source.into(),
            name: None,
            sample,
        })
    }

    pub fn dependency(mut self, model: impl Into<String>, sample: Option<f64>) -> Self {
        self.dependencies.push(DependencyBinding {
            model: model.into(),
            sample,
        });
        self
    }

    /// Root schema. Object nodes that are not yet marked root are promoted.
    pub fn schema(mut self, schema: SchemaNode) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn build(self) -> Result<ModelSpec> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::invalid(&self.name, "model name must not be empty"));
        }

        let schema = self
            .schema
            .ok_or_else(|| ModelError::invalid(&name, "missing root schema"))?;
        let schema = if schema.is_root() {
            schema
        } else {
            schema
                .into_root()
                .map_err(|err| ModelError::invalid(&name, err.to_string()))?
        };

        if let Some(key) = &self.key {
            if schema.field(key).is_none() {
                return Err(ModelError::invalid(
                    &name,
                    format!("key '{key}' is not a top-level field of the root object"),
                ));
            }
        }

        let mut aliases = HashSet::new();
        for input in &self.inputs {
            check_sample(&name, input.sample, &format!("input '{}'", input.alias()))?;
            if !aliases.insert(input.alias().to_string()) {
                return Err(ModelError::invalid(
                    &name,
                    format!("input '{}' is bound more than once", input.alias()),
                ));
            }
        }

        let mut models = HashSet::new();
        for dep in &self.dependencies {
            check_sample(&name, dep.sample, &format!("dependency '{}'", dep.model))?;
            if !models.insert(dep.model.clone()) {
                return Err(ModelError::invalid(
                    &name,
                    format!("dependency '{}' is declared more than once", dep.model),
                ));
            }
        }

        Ok(ModelSpec {
            name,
            count: self.count,
            key: self.key,
            seed: self.seed,
            inputs: self.inputs,
            dependencies: self.dependencies,
            schema,
        })
    }
}

fn check_sample(model: &str, sample: Option<f64>, what: &str) -> Result<()> {
    match sample {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(ModelError::invalid(
            model,
            format!("{what} sample must be a positive finite number, got {value}"),
        )),
        Some(value) if value > MAX_SAMPLE => Err(ModelError::invalid(
            model,
            format!("{what} sample {value} exceeds the maximum of {MAX_SAMPLE}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use fakeit_core::{Repeat, capability_fn};
    use serde_json::json;

    use super::*;

    fn root() -> SchemaNode {
        SchemaNode::object([(
            "id",
            SchemaNode::base(capability_fn("constant", |_| Ok(json!(1)))),
        )])
        .expect("object")
    }

    #[test]
    fn builds_with_defaults() {
        let spec = ModelSpec::builder("users").schema(root()).build().expect("spec");
        assert_eq!(spec.name(), "users");
        assert_eq!(spec.count(), 1);
        assert!(spec.schema().is_root());
        assert!(spec.key().is_none());
    }

    #[test]
    fn rejects_non_object_root() {
        let array = SchemaNode::array(
            SchemaNode::base(capability_fn("constant", |_| Ok(json!(1)))),
            Repeat::Fixed(2),
        )
        .expect("array");
        let err = ModelSpec::builder("users")
            .schema(array)
            .build()
            .expect_err("array root");
        assert!(matches!(err, ModelError::InvalidModel { .. }));
    }

    #[test]
    fn key_must_name_top_level_field() {
        assert!(
            ModelSpec::builder("users")
                .key("id")
                .schema(root())
                .build()
                .is_ok()
        );
        let err = ModelSpec::builder("users")
            .key("missing")
            .schema(root())
            .build()
            .expect_err("bad key");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rejects_bad_samples_and_duplicates() {
        for sample in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e19] {
            assert!(
                ModelSpec::builder("a")
                    .dependency("b", Some(sample))
                    .schema(root())
                    .build()
                    .is_err()
            );
        }
        assert!(
            ModelSpec::builder("a")
                .dependency("b", None)
                .dependency("b", Some(1.0))
                .schema(root())
                .build()
                .is_err()
        );
        assert!(
            ModelSpec::builder("a")
                .input_source("x.csv", Some(1.0))
                .input_source("x.csv", None)
                .schema(root())
                .build()
                .is_err()
        );
        assert!(ModelSpec::builder("  ").schema(root()).build().is_err());
        assert!(ModelSpec::builder("a").build().is_err());
    }
}
