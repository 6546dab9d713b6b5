use std::sync::Arc;

use rand::Rng;
use serde_json::{Value, json};

use fakeit_core::{Capability, CapabilityError};

use super::{Generator, GeneratorRegistry, bound};
use crate::errors::GenerationError;
use crate::params::{ParamKind, ParamSpec, validate_params};

const FIELD_PARAMS: &[ParamSpec] = &[ParamSpec::new("field", ParamKind::String, true)];
const INPUT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("input", ParamKind::String, true),
    ParamSpec::new("field", ParamKind::String, false),
    ParamSpec::new("mode", ParamKind::String, false),
];
const DEPENDENCY_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("model", ParamKind::String, true),
    ParamSpec::new("field", ParamKind::String, false),
    ParamSpec::new("mode", ParamKind::String, false),
];

pub(super) fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(IndexGenerator));
    registry.register_generator(Box::new(FieldGenerator));
    registry.register_generator(Box::new(InputGenerator));
    registry.register_generator(Box::new(DependencyGenerator));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputMode {
    Random,
    Cycle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DependencyMode {
    First,
    Random,
    All,
}

struct IndexGenerator;

impl Generator for IndexGenerator {
    fn id(&self) -> &'static str {
        "ref.index"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        validate_params(params, &[], self.id())?;
        Ok(bound(self.id(), |ctx| Ok(json!(ctx.index()))))
    }
}

struct FieldGenerator;

impl Generator for FieldGenerator {
    fn id(&self) -> &'static str {
        "ref.field"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, FIELD_PARAMS, self.id())?;
        let field = params.get_str("field").unwrap_or_default().to_string();
        Ok(bound(self.id(), move |ctx| {
            ctx.sibling(&field)
                .cloned()
                .ok_or_else(|| CapabilityError::MissingField(field.clone()))
        }))
    }
}

struct InputGenerator;

impl Generator for InputGenerator {
    fn id(&self) -> &'static str {
        "ref.input"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, INPUT_PARAMS, self.id())?;
        let input = params.get_str("input").unwrap_or_default().to_string();
        let field = params.get_str("field").map(str::to_string);
        let mode = match params.get_str("mode").unwrap_or("random") {
            "random" => InputMode::Random,
            "cycle" => InputMode::Cycle,
            other => {
                return Err(GenerationError::InvalidModel(format!(
                    "{}: unsupported mode '{other}' (expected random or cycle)",
                    self.id()
                )));
            }
        };
        Ok(bound(self.id(), move |ctx| {
            let rows = ctx.input(&input)?;
            if rows.is_empty() {
                return Err(CapabilityError::failed(format!("input '{input}' has no rows")));
            }
            let idx = match mode {
                InputMode::Cycle => usize::try_from(ctx.index()).unwrap_or(0) % rows.len(),
                InputMode::Random => ctx.rng().random_range(0..rows.len()),
            };
            project(&rows[idx], field.as_deref())
        }))
    }
}

struct DependencyGenerator;

impl Generator for DependencyGenerator {
    fn id(&self) -> &'static str {
        "ref.dependency"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, DEPENDENCY_PARAMS, self.id())?;
        let model = params.get_str("model").unwrap_or_default().to_string();
        let field = params.get_str("field").map(str::to_string);
        let mode = match params.get_str("mode").unwrap_or("random") {
            "first" => DependencyMode::First,
            "random" => DependencyMode::Random,
            "all" => DependencyMode::All,
            other => {
                return Err(GenerationError::InvalidModel(format!(
                    "{}: unsupported mode '{other}' (expected first, random or all)",
                    self.id()
                )));
            }
        };
        Ok(bound(self.id(), move |ctx| {
            let documents = ctx.dependency(&model)?;
            match mode {
                DependencyMode::All => documents
                    .iter()
                    .map(|doc| project(doc, field.as_deref()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ if documents.is_empty() => Ok(Value::Null),
                DependencyMode::First => project(documents[0], field.as_deref()),
                DependencyMode::Random => {
                    let idx = ctx.rng().random_range(0..documents.len());
                    project(documents[idx], field.as_deref())
                }
            }
        }))
    }
}

fn project(value: &Value, field: Option<&str>) -> Result<Value, CapabilityError> {
    match field {
        None => Ok(value.clone()),
        Some(field) => value
            .get(field)
            .cloned()
            .ok_or_else(|| CapabilityError::MissingField(field.to_string())),
    }
}
