use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use fakeit_core::{NodePath, SchemaNode};
use fakeit_model::{BaseDecl, CountDecl, ModelDecl, ModelRegistry, ModelSpec, NodeDecl};

use crate::errors::GenerationError;
use crate::generators::GeneratorRegistry;
use crate::sampling::model_seed;

/// Compile declarations into a populated model registry.
///
/// Every base node is bound to its generator here, so unknown ids and bad
/// params surface before generation starts. Count ranges are resolved with
/// the model's seed.
pub fn compile_models(
    decls: &[ModelDecl],
    generators: &GeneratorRegistry,
    run_seed: u64,
) -> Result<ModelRegistry, GenerationError> {
    let mut registry = ModelRegistry::new();
    for decl in decls {
        let spec = compile_model(decl, generators, run_seed)?;
        debug!(model = %spec.name(), count = spec.count(), "compiled model");
        registry.register(spec)?;
    }
    Ok(registry)
}

fn compile_model(
    decl: &ModelDecl,
    generators: &GeneratorRegistry,
    run_seed: u64,
) -> Result<ModelSpec, GenerationError> {
    let scope = BindingScope {
        model: &decl.name,
        inputs: decl.inputs.iter().map(|input| input.alias()).collect(),
        dependencies: decl.dependencies.iter().map(|dep| dep.model.as_str()).collect(),
    };
    let mut path = NodePath::root();
    let schema = compile_node(&decl.schema, generators, &scope, &mut path)?;

    let mut builder = ModelSpec::builder(decl.name.clone())
        .count(resolve_count(decl, run_seed)?)
        .seed(decl.seed)
        .schema(schema);
    if let Some(key) = &decl.key {
        builder = builder.key(key.clone());
    }
    for input in &decl.inputs {
        builder = builder.input(input.clone());
    }
    for dep in &decl.dependencies {
        builder = builder.dependency(dep.model.clone(), dep.sample);
    }
    Ok(builder.build()?)
}

fn resolve_count(decl: &ModelDecl, run_seed: u64) -> Result<u64, GenerationError> {
    match decl.count {
        None => Ok(1),
        Some(CountDecl::Fixed(count)) => Ok(count),
        Some(CountDecl::Range { min, max }) if min > max => Err(GenerationError::InvalidModel(
            format!("model '{}': count min ({min}) must be <= max ({max})", decl.name),
        )),
        Some(CountDecl::Range { min, max }) => {
            let seed = model_seed(run_seed, &decl.name, decl.seed);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            Ok(rng.random_range(min..=max))
        }
    }
}

struct BindingScope<'a> {
    model: &'a str,
    inputs: HashSet<&'a str>,
    dependencies: HashSet<&'a str>,
}

impl BindingScope<'_> {
    fn error(&self, path: &NodePath, message: impl std::fmt::Display) -> GenerationError {
        GenerationError::InvalidModel(format!("model '{}' at {path}: {message}", self.model))
    }

    // References must name bindings declared on the same model.
    fn check_references(&self, decl: &BaseDecl, path: &NodePath) -> Result<(), GenerationError> {
        let param = |key: &str| {
            decl.params
                .as_ref()
                .and_then(|params| params.get(key))
                .and_then(|value| value.as_str())
        };
        match decl.generator.as_str() {
            "ref.input" => match param("input") {
                Some(input) if !self.inputs.contains(input) => {
                    Err(self.error(path, format!("input '{input}' is not bound to this model")))
                }
                _ => Ok(()),
            },
            "ref.dependency" => match param("model") {
                Some(model) if !self.dependencies.contains(model) => Err(self.error(
                    path,
                    format!("model '{model}' is not a dependency of this model"),
                )),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

fn compile_node(
    decl: &NodeDecl,
    generators: &GeneratorRegistry,
    scope: &BindingScope<'_>,
    path: &mut NodePath,
) -> Result<SchemaNode, GenerationError> {
    match decl {
        NodeDecl::Base(base) => {
            scope.check_references(base, path)?;
            let capability = generators
                .bind(&base.generator, base.params.as_ref())
                .map_err(|err| scope.error(path, err))?;
            Ok(SchemaNode::base_shared(capability))
        }
        NodeDecl::Object(object) => {
            let mut fields = Vec::with_capacity(object.properties.len());
            for (name, child) in &object.properties {
                path.push_field(name.as_str());
                let node = compile_node(child, generators, scope, path);
                path.pop();
                fields.push((name.clone(), node?));
            }
            SchemaNode::object(fields).map_err(|err| scope.error(path, err))
        }
        NodeDecl::Array(array) => {
            path.push_items();
            let items = compile_node(&array.items, generators, scope, path);
            path.pop();
            SchemaNode::array(items?, array.repeat).map_err(|err| scope.error(path, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use fakeit_model::ModelFile;

    use super::*;

    fn decls(value: serde_json::Value) -> Vec<ModelDecl> {
        serde_json::from_value::<ModelFile>(value)
            .expect("model file")
            .into_models()
    }

    #[test]
    fn compiles_nested_schema_in_declared_order() {
        let models = decls(json!({
            "name": "users",
            "key": "id",
            "count": 5,
            "schema": {"type": "object", "properties": {
                "id": {"type": "base", "generator": "primitive.uuid"},
                "tags": {"type": "array", "repeat": {"min": 1, "max": 2},
                         "items": {"type": "base", "generator": "faker.lorem.word"}}
            }}
        }));
        let registry = compile_models(&models, &GeneratorRegistry::new(), 1).expect("compile");
        let spec = registry.resolve("users").expect("users");
        assert_eq!(spec.count(), 5);
        assert_eq!(spec.key(), Some("id"));
        assert_eq!(spec.schema().field_names(), vec!["id", "tags"]);
    }

    #[test]
    fn count_range_is_resolved_deterministically() {
        let models = decls(json!({
            "name": "a",
            "count": {"min": 10, "max": 20},
            "schema": {"type": "object", "properties": {
                "n": {"type": "base", "generator": "ref.index"}
            }}
        }));
        let generators = GeneratorRegistry::new();
        let first = compile_models(&models, &generators, 9).expect("compile");
        let second = compile_models(&models, &generators, 9).expect("compile");
        let count = first.resolve("a").expect("a").count();
        assert!((10..=20).contains(&count));
        assert_eq!(count, second.resolve("a").expect("a").count());
    }

    #[test]
    fn unknown_generator_reports_node_path() {
        let models = decls(json!({
            "name": "a",
            "schema": {"type": "object", "properties": {
                "address": {"type": "object", "properties": {
                    "city": {"type": "base", "generator": "faker.address.town"}
                }}
            }}
        }));
        let err = compile_models(&models, &GeneratorRegistry::new(), 1).expect_err("unknown");
        let message = err.to_string();
        assert!(message.contains("$.address.city"), "{message}");
        assert!(message.contains("faker.address.town"), "{message}");
    }

    #[test]
    fn references_must_name_bound_inputs_and_dependencies() {
        let models = decls(json!({
            "name": "a",
            "inputs": [{"source": "countries.csv", "name": "countries"}],
            "schema": {"type": "object", "properties": {
                "country": {"type": "base", "generator": "ref.input",
                            "params": {"input": "countries.csv"}}
            }}
        }));
        assert!(compile_models(&models, &GeneratorRegistry::new(), 1).is_err());

        let models = decls(json!({
            "name": "a",
            "schema": {"type": "object", "properties": {
                "b": {"type": "base", "generator": "ref.dependency", "params": {"model": "b"}}
            }}
        }));
        let err = compile_models(&models, &GeneratorRegistry::new(), 1).expect_err("undeclared");
        assert!(err.to_string().contains("not a dependency"));
    }

    #[test]
    fn duplicate_models_are_rejected() {
        let model = json!({"name": "a", "schema": {"type": "object", "properties": {
            "n": {"type": "base", "generator": "ref.index"}
        }}});
        let models = decls(json!({"models": [model.clone(), model]}));
        let err = compile_models(&models, &GeneratorRegistry::new(), 1).expect_err("duplicate");
        assert!(matches!(
            err,
            GenerationError::Model(fakeit_model::ModelError::DuplicateModel(_))
        ));
    }
}
