use std::collections::HashSet;

use serde_json::{Value, json};

use fakeit_core::{CapabilityError, SchemaNode, capability_fn};
use fakeit_generate::{
    CancellationToken, GenerateOptions, GenerationEngine, GenerationError, GeneratorRegistry,
    MemoryInputLoader, ModelStatus,
};
use fakeit_model::{ModelError, ModelRegistry, ModelSpec, ModelSpecBuilder};

fn options(concurrency: usize) -> GenerateOptions {
    GenerateOptions {
        seed: 99,
        concurrency: Some(concurrency),
        ..GenerateOptions::default()
    }
}

fn index_schema() -> SchemaNode {
    SchemaNode::object([(
        "id",
        SchemaNode::base(capability_fn("test.index", |ctx| Ok(json!(ctx.index())))),
    )])
    .expect("object")
}

fn people(count: usize) -> Vec<Value> {
    (0..count)
        .map(|idx| json!({"id": idx, "name": format!("person-{idx}")}))
        .collect()
}

fn build(builder: ModelSpecBuilder) -> ModelSpec {
    builder.build().expect("spec")
}

fn registry(specs: Vec<ModelSpec>) -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    for spec in specs {
        registry.register(spec).expect("register");
    }
    registry
}

#[test]
fn documents_keep_index_order_under_parallelism() {
    let registry = registry(vec![build(
        ModelSpec::builder("rows").count(500).schema(index_schema()),
    )]);
    let result = GenerationEngine::new(options(8), MemoryInputLoader::new())
        .run(&registry)
        .expect("run");

    let store = result.store("rows").expect("rows");
    assert_eq!(store.len(), 500);
    for (idx, doc) in store.iter().enumerate() {
        assert_eq!(doc["id"], json!(idx));
    }
}

#[test]
fn fractional_samples_round_and_dependencies_come_first() {
    let counts = SchemaNode::object([
        (
            "inputs",
            SchemaNode::base(capability_fn("test.inputs", |ctx| {
                Ok(json!(ctx.input("people.csv")?.len()))
            })),
        ),
        (
            "attached",
            SchemaNode::base(capability_fn("test.attached", |ctx| {
                Ok(json!(ctx.dependency("b")?.len()))
            })),
        ),
    ])
    .expect("object");

    let a = build(
        ModelSpec::builder("a")
            .count(1)
            .input_source("people.csv", Some(10.12334))
            .dependency("b", Some(10.1234))
            .schema(counts),
    );
    let b = build(ModelSpec::builder("b").count(6).schema(index_schema()));
    let loader = MemoryInputLoader::new().with_source("people.csv", people(40));

    let result = GenerationEngine::new(options(2), loader)
        .run(&registry(vec![a, b]))
        .expect("run");

    let order: Vec<&str> = result.stores.iter().map(|store| store.model()).collect();
    assert_eq!(order, vec!["b", "a"]);

    let doc = &result.store("a").expect("a").documents()[0];
    assert_eq!(doc["inputs"], json!(10));
    assert_eq!(doc["attached"], json!(6));
    assert_eq!(result.report.warnings_by_code.get("attachment_degraded"), Some(&1));
}

#[test]
fn sampled_inputs_are_distinct_rows() {
    let schema = SchemaNode::object([(
        "names",
        SchemaNode::base(capability_fn("test.names", |ctx| {
            let rows = ctx.input("people")?;
            Ok(Value::Array(rows.iter().map(|row| row["name"].clone()).collect()))
        })),
    )])
    .expect("object");
    let spec = build(
        ModelSpec::builder("sampler")
            .input(fakeit_model::InputBinding {
                source: "people.json".to_string(),
                name: Some("people".to_string()),
                sample: Some(10.0),
            })
            .schema(schema),
    );
    let loader = MemoryInputLoader::new().with_source("people.json", people(100));

    let result = GenerationEngine::new(options(1), loader)
        .run(&registry(vec![spec]))
        .expect("run");

    let names = result.store("sampler").expect("sampler").documents()[0]["names"]
        .as_array()
        .expect("names")
        .clone();
    assert_eq!(names.len(), 10);
    let distinct: HashSet<String> = names
        .iter()
        .map(|name| name.as_str().expect("name").to_string())
        .collect();
    assert_eq!(distinct.len(), 10);
}

#[test]
fn each_document_attaches_requested_dependency_documents() {
    let schema = SchemaNode::object([(
        "parents",
        SchemaNode::base(capability_fn("test.parents", |ctx| {
            let docs = ctx.dependency("parent")?;
            Ok(Value::Array(docs.iter().map(|doc| doc["id"].clone()).collect()))
        })),
    )])
    .expect("object");
    let parent = build(ModelSpec::builder("parent").count(5).schema(index_schema()));
    let child = build(
        ModelSpec::builder("child")
            .count(20)
            .dependency("parent", Some(2.0))
            .schema(schema),
    );

    let result = GenerationEngine::new(options(4), MemoryInputLoader::new())
        .run(&registry(vec![child, parent]))
        .expect("run");

    for doc in result.store("child").expect("child").iter() {
        let ids: Vec<u64> = doc["parents"]
            .as_array()
            .expect("parents")
            .iter()
            .map(|id| id.as_u64().expect("id"))
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|id| *id < 5));
    }
    assert!(result.report.warnings.is_empty());
}

#[test]
fn empty_dependency_store_yields_null_and_empty_refs() {
    let generators = GeneratorRegistry::new();
    let dependency_ref = |params: Value| {
        SchemaNode::base_shared(
            generators
                .bind("ref.dependency", Some(&params))
                .expect("bind ref.dependency"),
        )
    };
    let schema = SchemaNode::object([
        ("first", dependency_ref(json!({"model": "b", "mode": "first"}))),
        ("random", dependency_ref(json!({"model": "b", "field": "id"}))),
        ("all", dependency_ref(json!({"model": "b", "mode": "all"}))),
    ])
    .expect("object");
    let a = build(
        ModelSpec::builder("a")
            .count(4)
            .dependency("b", Some(2.0))
            .schema(schema),
    );
    let b = build(ModelSpec::builder("b").count(0).schema(index_schema()));

    let result = GenerationEngine::new(options(2), MemoryInputLoader::new())
        .run(&registry(vec![a, b]))
        .expect("run");

    assert!(result.store("b").expect("b").is_empty());
    let store = result.store("a").expect("a");
    assert_eq!(store.len(), 4);
    for doc in store.iter() {
        assert_eq!(doc["first"], Value::Null);
        assert_eq!(doc["random"], Value::Null);
        assert_eq!(doc["all"], json!([]));
    }
    assert_eq!(result.report.warnings_by_code.get("attachment_degraded"), Some(&1));
    assert!(result.report.is_success());
}

#[test]
fn failing_document_is_isolated() {
    let schema = SchemaNode::object([(
        "value",
        SchemaNode::base(capability_fn("test.flaky", |ctx| {
            if ctx.index() == 3 {
                Err(CapabilityError::failed("boom"))
            } else {
                Ok(json!(ctx.index()))
            }
        })),
    )])
    .expect("object");
    let spec = build(ModelSpec::builder("flaky").count(10).schema(schema));

    let result = GenerationEngine::new(options(4), MemoryInputLoader::new())
        .run(&registry(vec![spec]))
        .expect("run");

    let store = result.store("flaky").expect("flaky");
    assert_eq!(store.len(), 9);
    assert!(store.iter().all(|doc| doc["value"] != json!(3)));

    assert_eq!(result.report.failures.len(), 1);
    let failure = &result.report.failures[0];
    assert_eq!(failure.index, 3);
    assert_eq!(failure.path, "$.value");
    assert_eq!(failure.message, "boom");

    let model = result.report.model("flaky").expect("report");
    assert_eq!((model.generated, model.failed), (9, 1));

    match result.into_result() {
        Err(GenerationError::Failed(report)) => {
            assert_eq!(report.summary(), "1 document failures across 1 models");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn missing_input_aborts_model_and_dependents_only() {
    let broken = build(
        ModelSpec::builder("broken")
            .input_source("missing.csv", None)
            .schema(index_schema()),
    );
    let downstream = build(
        ModelSpec::builder("downstream")
            .dependency("broken", None)
            .schema(index_schema()),
    );
    let standalone = build(ModelSpec::builder("standalone").count(3).schema(index_schema()));

    let result = GenerationEngine::new(options(2), MemoryInputLoader::new())
        .run(&registry(vec![broken, downstream, standalone]))
        .expect("run");

    let report = &result.report;
    let broken = report.model("broken").expect("broken");
    assert_eq!(broken.status, ModelStatus::Aborted);
    assert!(
        broken
            .reason
            .as_deref()
            .expect("reason")
            .contains("missing.csv")
    );
    assert_eq!(
        report.model("downstream").expect("downstream").status,
        ModelStatus::Skipped
    );
    assert_eq!(
        report.model("standalone").expect("standalone").status,
        ModelStatus::Completed
    );
    assert_eq!(result.store("standalone").expect("standalone").len(), 3);
    assert!(result.store("broken").is_none());
    assert_eq!(report.aborted_models(), vec!["broken", "downstream"]);
    assert!(!report.is_success());
}

#[test]
fn unknown_dependency_fails_before_generation() {
    let a = build(ModelSpec::builder("a").schema(index_schema()));
    let c = build(
        ModelSpec::builder("c")
            .dependency("a", None)
            .dependency("j", None)
            .schema(index_schema()),
    );

    let err = GenerationEngine::new(options(1), MemoryInputLoader::new())
        .run(&registry(vec![a, c]))
        .expect_err("unknown model");
    match err {
        GenerationError::Model(ModelError::UnknownModel {
            name,
            referenced_by,
        }) => {
            assert_eq!(name, "j");
            assert_eq!(referenced_by.as_deref(), Some("c"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn cyclic_models_are_rejected() {
    let a = build(
        ModelSpec::builder("a")
            .dependency("b", None)
            .schema(index_schema()),
    );
    let b = build(
        ModelSpec::builder("b")
            .dependency("a", None)
            .schema(index_schema()),
    );

    let err = GenerationEngine::new(options(1), MemoryInputLoader::new())
        .run(&registry(vec![a, b]))
        .expect_err("cycle");
    assert!(matches!(
        err,
        GenerationError::Model(ModelError::CyclicDependency { .. })
    ));
}

#[test]
fn cancellation_stops_the_run() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let schema = SchemaNode::object([(
        "id",
        SchemaNode::base(capability_fn("test.cancel", move |ctx| {
            trigger.cancel();
            Ok(json!(ctx.index()))
        })),
    )])
    .expect("object");
    let first = build(ModelSpec::builder("first").count(200).schema(schema));
    let second = build(ModelSpec::builder("second").count(5).schema(index_schema()));

    let result = GenerationEngine::new(options(1), MemoryInputLoader::new())
        .with_cancellation(token)
        .run(&registry(vec![first, second]))
        .expect("run");

    assert!(result.report.cancelled);
    assert!(result.stores.is_empty());
    assert_eq!(
        result.report.model("first").expect("first").status,
        ModelStatus::Cancelled
    );
    assert!(result.report.model("second").is_none());
}

#[test]
fn cancelled_before_start_generates_nothing() {
    let engine = GenerationEngine::new(options(1), MemoryInputLoader::new());
    engine.cancellation_token().cancel();
    let spec = build(ModelSpec::builder("rows").count(3).schema(index_schema()));

    let result = engine.run(&registry(vec![spec])).expect("run");
    assert!(result.report.cancelled);
    assert!(result.report.models.is_empty());
}
