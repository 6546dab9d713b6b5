use std::collections::{HashMap, HashSet};

use fakeit_core::DependencyGraph;
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{IssueSeverity, ModelError, ValidationIssue, ValidationReport};
use crate::load::ModelSource;
use crate::model::{CountDecl, ModelDecl, ModelFile, NodeDecl, escape_pointer};
use crate::sampling::MAX_SAMPLE;
use crate::schema::model_json_schema;

/// Declarations that passed validation, with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedModels {
    pub models: Vec<ModelDecl>,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate one model file document against the model JSON Schema.
pub fn validate_model_json(
    model_json: &Value,
    model_schema: &Value,
) -> Result<ValidationReport, ModelError> {
    let compiled =
        JSONSchema::compile(model_schema).map_err(|err| ModelError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(model_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Semantic checks over the full set of declarations.
///
/// Paths are JSON pointers into the combined `models` list, in load order.
pub fn validate_declarations(models: &[ModelDecl]) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, model) in models.iter().enumerate() {
        let base = format!("/models/{idx}");
        if model.name.trim().is_empty() {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "empty_model_name",
                format!("{base}/name"),
                "model name must not be empty",
                None,
            ));
        }
        if let Some(first) = seen.insert(model.name.as_str(), idx) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_model",
                format!("{base}/name"),
                format!("model '{}' is already declared", model.name),
                Some(format!("rename one of /models/{first} and {base}")),
            ));
        }

        validate_count(model, &base, &mut report);
        validate_bindings(model, &base, &mut report);
        validate_schema(model, &base, &mut report);
    }

    validate_dependencies(models, &mut report);

    report
}

/// Check that every base node names a known generator.
pub fn validate_generators<F>(models: &[ModelDecl], is_known: F) -> ValidationReport
where
    F: Fn(&str) -> bool,
{
    let mut report = ValidationReport::default();
    for (idx, model) in models.iter().enumerate() {
        model
            .schema
            .visit_bases(&format!("/models/{idx}/schema"), &mut |pointer, base| {
                if !is_known(&base.generator) {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "unknown_generator",
                        format!("{pointer}/generator"),
                        format!("unknown generator '{}'", base.generator),
                        Some("run `fakeit generators` to list the catalogue".to_string()),
                    ));
                }
            });
    }
    report
}

/// Validate model sources end-to-end, returning structured issues on failure.
pub fn validate_models(sources: &[ModelSource]) -> Result<ValidatedModels, ValidationReport> {
    let schema = match serde_json::to_value(model_json_schema()) {
        Ok(schema) => schema,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    let mut structural = ValidationReport::default();
    let mut models = Vec::new();
    for source in sources {
        match validate_model_json(&source.value, &schema) {
            Ok(report) if report.is_ok() => {}
            Ok(report) => {
                structural.merge(with_origin(report, &source.origin));
                continue;
            }
            Err(err) => {
                structural.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "schema_validation_error",
                    "/",
                    format!("{}: {err}", source.origin),
                    None,
                ));
                continue;
            }
        }

        match serde_json::from_value::<ModelFile>(source.value.clone()) {
            Ok(file) => models.extend(file.into_models()),
            Err(err) => structural.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_model_json",
                "/",
                format!("{}: {err}", source.origin),
                None,
            )),
        }
    }

    if !structural.is_ok() {
        return Err(structural);
    }

    let semantic = validate_declarations(&models);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedModels {
        models,
        warnings: semantic.warnings,
    })
}

fn validate_count(model: &ModelDecl, base: &str, report: &mut ValidationReport) {
    if let Some(CountDecl::Range { min, max }) = model.count {
        if min > max {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_count_range",
                format!("{base}/count"),
                format!("count min ({min}) must be <= max ({max})"),
                None,
            ));
        }
    }
}

fn validate_bindings(model: &ModelDecl, base: &str, report: &mut ValidationReport) {
    let mut aliases = HashSet::new();
    for (idx, input) in model.inputs.iter().enumerate() {
        let path = format!("{base}/inputs/{idx}");
        if input.source.trim().is_empty() {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "empty_input_source",
                format!("{path}/source"),
                "input source must not be empty",
                None,
            ));
        }
        check_sample(input.sample, &path, report);
        if !aliases.insert(input.alias()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_input",
                path,
                format!("input '{}' is bound more than once", input.alias()),
                Some("give one of the bindings a distinct `name`".to_string()),
            ));
        }
    }

    let mut deps = HashSet::new();
    for (idx, dep) in model.dependencies.iter().enumerate() {
        let path = format!("{base}/dependencies/{idx}");
        check_sample(dep.sample, &path, report);
        if dep.model == model.name {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "self_dependency",
                format!("{path}/model"),
                format!("model '{}' depends on itself", model.name),
                None,
            ));
        }
        if !deps.insert(dep.model.as_str()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_dependency",
                path,
                format!("dependency '{}' is declared more than once", dep.model),
                None,
            ));
        }
    }
}

fn check_sample(sample: Option<f64>, path: &str, report: &mut ValidationReport) {
    if let Some(value) = sample {
        if !value.is_finite() || value <= 0.0 {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_sample",
                format!("{path}/sample"),
                format!("sample must be a positive finite number, got {value}"),
                None,
            ));
        } else if value > MAX_SAMPLE {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_sample",
                format!("{path}/sample"),
                format!("sample {value} exceeds the maximum of {MAX_SAMPLE}"),
                None,
            ));
        }
    }
}

fn validate_schema(model: &ModelDecl, base: &str, report: &mut ValidationReport) {
    let schema_path = format!("{base}/schema");
    let NodeDecl::Object(root) = &model.schema else {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "root_not_object",
            schema_path,
            format!(
                "model root must be an object node, found {}",
                model.schema.variant()
            ),
            None,
        ));
        return;
    };

    if let Some(key) = &model.key {
        if !root.properties.contains_key(key) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_key_field",
                format!("{base}/key"),
                format!("key '{key}' is not a top-level field of '{}'", model.name),
                None,
            ));
        }
    }

    validate_node(&model.schema, &schema_path, report);
}

fn validate_node(node: &NodeDecl, path: &str, report: &mut ValidationReport) {
    match node {
        NodeDecl::Base(base) => {
            if base.generator.trim().is_empty() {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "empty_generator",
                    format!("{path}/generator"),
                    "generator id must not be empty",
                    None,
                ));
            }
            if let Some(params) = &base.params {
                if !params.is_object() && !params.is_null() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "invalid_params",
                        format!("{path}/params"),
                        "params must be an object",
                        None,
                    ));
                }
            }
        }
        NodeDecl::Object(object) => {
            if object.properties.is_empty() {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "empty_object",
                    path.to_string(),
                    "object node has no properties and always generates {}",
                    None,
                ));
            }
            for (name, child) in &object.properties {
                validate_node(
                    child,
                    &format!("{path}/properties/{}", escape_pointer(name)),
                    report,
                );
            }
        }
        NodeDecl::Array(array) => {
            if let Err(err) = array.repeat.validate() {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "invalid_repeat_range",
                    format!("{path}/repeat"),
                    err.to_string(),
                    None,
                ));
            }
            validate_node(&array.items, &format!("{path}/items"), report);
        }
    }
}

fn validate_dependencies(models: &[ModelDecl], report: &mut ValidationReport) {
    let names: HashSet<&str> = models.iter().map(|model| model.name.as_str()).collect();
    let mut resolvable = true;

    for (idx, model) in models.iter().enumerate() {
        for (dep_idx, dep) in model.dependencies.iter().enumerate() {
            if !names.contains(dep.model.as_str()) {
                resolvable = false;
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "unknown_dependency",
                    format!("/models/{idx}/dependencies/{dep_idx}/model"),
                    format!(
                        "model '{}' depends on undeclared model '{}'",
                        model.name, dep.model
                    ),
                    None,
                ));
            }
        }
    }

    if !resolvable || names.len() != models.len() {
        return;
    }

    let graph = DependencyGraph::build(models.iter().map(|model| {
        (
            model.name.as_str(),
            model.dependencies.iter().map(|dep| dep.model.as_str()),
        )
    }));
    let cycle = match graph.map(|graph| graph.topo_order()) {
        Ok(Ok(_)) => return,
        Ok(Err(err)) | Err(err) => err,
    };
    report.push_error(ValidationIssue::new(
        IssueSeverity::Error,
        "dependency_cycle",
        "/models",
        cycle.to_string(),
        Some("remove one of the dependencies on the cycle".to_string()),
    ));
}

fn with_origin(report: ValidationReport, origin: &str) -> ValidationReport {
    let tag = |mut issue: ValidationIssue| {
        issue.message = format!("{origin}: {}", issue.message);
        issue
    };
    ValidationReport {
        errors: report.errors.into_iter().map(tag).collect(),
        warnings: report.warnings.into_iter().map(tag).collect(),
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
