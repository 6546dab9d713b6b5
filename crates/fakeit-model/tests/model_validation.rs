use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use fakeit_model::{
    ModelError, load_model_sources, load_models, model_json_schema, validate_generators,
    validate_model_json, validate_models,
};

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn invalid_report(file: &str) -> fakeit_model::ValidationReport {
    match load_models(&demos_dir().join("invalid").join(file)) {
        Err(ModelError::Invalid(report)) => report,
        other => panic!("expected validation failure for {file}, got {other:?}"),
    }
}

#[test]
fn demo_models_are_valid() {
    let validated = load_models(&demos_dir().join("models")).expect("demo models");
    let names: Vec<&str> = validated
        .models
        .iter()
        .map(|model| model.name.as_str())
        .collect();
    assert_eq!(names, vec!["addresses", "orders", "users"]);
    assert!(validated.warnings.is_empty(), "{:?}", validated.warnings);

    let users = &validated.models[2];
    assert_eq!(users.inputs[0].alias(), "countries");
    assert_eq!(users.dependencies[0].model, "addresses");
    assert_eq!(users.dependencies[0].sample, Some(2.0));
}

#[test]
fn demo_models_match_emitted_json_schema() {
    let schema = serde_json::to_value(model_json_schema()).expect("schema json");
    for source in load_model_sources(&demos_dir().join("models")).expect("sources") {
        let report = validate_model_json(&source.value, &schema).expect("compile schema");
        assert!(report.is_ok(), "{}: {:?}", source.origin, report.errors);
    }
}

#[test]
fn demo_generators_resolve_against_catalogue() {
    let validated = load_models(&demos_dir().join("models")).expect("demo models");
    let known = [
        "primitive.sequence",
        "primitive.uuid",
        "primitive.text.pattern",
        "primitive.timestamp",
        "primitive.choice",
        "primitive.int",
        "primitive.float",
        "faker.address.street",
        "faker.address.city",
        "faker.address.zip",
        "faker.name.full_name",
        "faker.internet.email",
        "faker.lorem.word",
        "ref.input",
        "ref.dependency",
    ];
    let report = validate_generators(&validated.models, |id| known.contains(&id));
    assert!(report.is_ok(), "{:?}", report.errors);

    let report = validate_generators(&validated.models, |id| id != "faker.lorem.word");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, "unknown_generator");
    assert_eq!(
        report.errors[0].path,
        "/models/2/schema/properties/tags/items/generator"
    );
}

#[test]
fn cycle_is_reported_with_full_path() {
    let report = invalid_report("cycle.yaml");
    let issue = report
        .errors
        .iter()
        .find(|issue| issue.code == "dependency_cycle")
        .expect("cycle issue");
    assert!(issue.message.contains("a -> b -> c -> a"), "{}", issue.message);
}

#[test]
fn unknown_dependency_names_the_missing_model() {
    let report = invalid_report("unknown_dependency.yaml");
    assert_eq!(report.errors.len(), 1);
    let issue = &report.errors[0];
    assert_eq!(issue.code, "unknown_dependency");
    assert_eq!(issue.path, "/models/1/dependencies/1/model");
    assert!(issue.message.contains("'j'"));
}

#[test]
fn non_object_root_is_rejected() {
    let report = invalid_report("array_root.yaml");
    assert!(report.has_code("root_not_object"));
}

#[test]
fn schema_violations_carry_origin() {
    let dir = std::env::temp_dir().join(format!("fakeit_models_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let file = dir.join("broken.yaml");
    fs::write(&file, "name: broken\ncount: many\nschema: {type: object}\n").expect("write model");

    let sources = load_model_sources(&dir).expect("sources");
    let report = validate_models(&sources).expect_err("schema violation");
    assert!(report.has_code("schema_violation"));
    assert!(
        report
            .errors
            .iter()
            .all(|issue| issue.message.contains("broken.yaml"))
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn directory_loading_skips_unrelated_files() {
    let dir = std::env::temp_dir().join(format!("fakeit_models_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    fs::write(dir.join("notes.txt"), "not a model").expect("write notes");
    fs::write(
        dir.join("b.yml"),
        "name: b\nschema: {type: object, properties: {id: {type: base, generator: ref.index}}}\n",
    )
    .expect("write b");
    fs::write(
        dir.join("a.json"),
        r#"{"models": [{"name": "a", "dependencies": [{"model": "b"}], "schema": {"type": "object", "properties": {"id": {"type": "base", "generator": "ref.index"}}}}]}"#,
    )
    .expect("write a");

    let sources = load_model_sources(&dir).expect("sources");
    assert_eq!(sources.len(), 2);
    assert!(sources[0].origin.ends_with("a.json"));
    assert!(matches!(sources[0].value.get("models"), Some(Value::Array(_))));

    let validated = validate_models(&sources).expect("valid");
    let names: Vec<&str> = validated.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);

    fs::remove_dir_all(&dir).ok();
}
