use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPool;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use fakeit_core::{AttachedDocuments, GenerationContext, InputRows, NodeKind, SchemaGenerationError};
use fakeit_model::{ModelRegistry, ModelSpec};

use crate::cancel::CancellationToken;
use crate::errors::GenerationError;
use crate::input::{InputError, InputLoader};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport, ModelReport, ModelStatus};
use crate::sampling::{document_seed, hash_seed, model_seed, pick};
use crate::store::{GeneratedStore, StoreBuilder};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Sealed stores in generation order.
    pub stores: Vec<GeneratedStore>,
    pub report: GenerationReport,
}

impl GenerationResult {
    pub fn store(&self, model: &str) -> Option<&GeneratedStore> {
        self.stores.iter().find(|store| store.model() == model)
    }

    /// Fail when any document failed or any model was aborted.
    pub fn into_result(self) -> Result<Self, GenerationError> {
        if self.report.is_success() {
            Ok(self)
        } else {
            Err(GenerationError::Failed(self.report))
        }
    }
}

/// Runs every registered model in dependency order.
#[derive(Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
    loader: Arc<dyn InputLoader>,
    cancel: CancellationToken,
    run_id: Option<String>,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions, loader: impl InputLoader + 'static) -> Self {
        Self {
            options,
            loader: Arc::new(loader),
            cancel: CancellationToken::new(),
            run_id: None,
        }
    }

    /// Use a caller-provided run id instead of a fresh one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn run(&self, registry: &ModelRegistry) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let resolved = registry.resolve_order()?;
        let threads = self.options.threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| GenerationError::ThreadPool(err.to_string()))?;

        let run_id = self
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut report = GenerationReport::new(run_id.clone(), self.options.seed, threads);
        info!(
            run_id = %run_id,
            models = resolved.order.len(),
            seed = self.options.seed,
            threads,
            "generation started"
        );

        let mut stores: HashMap<String, GeneratedStore> = HashMap::new();
        let mut ordered = Vec::with_capacity(resolved.order.len());
        // dependent model -> aborted model that blocks it
        let mut blocked: BTreeMap<String, String> = BTreeMap::new();

        for spec in &resolved.order {
            let name = spec.name();
            if self.cancel.is_cancelled() {
                warn!(run_id = %run_id, model = %name, "generation cancelled");
                report.cancelled = true;
                break;
            }

            if let Some(cause) = blocked.get(name) {
                warn!(model = %name, cause = %cause, "model skipped");
                report.models.push(ModelReport {
                    model: name.to_string(),
                    status: ModelStatus::Skipped,
                    requested: spec.count(),
                    generated: 0,
                    failed: 0,
                    duration_ms: 0,
                    reason: Some(format!("dependency '{cause}' was aborted")),
                });
                continue;
            }

            match self.run_phase(&pool, spec, &stores, &mut report) {
                Ok(Some(store)) => {
                    stores.insert(name.to_string(), store.clone());
                    ordered.push(store);
                }
                Ok(None) => {
                    report.cancelled = true;
                    break;
                }
                Err(err) => {
                    warn!(model = %name, error = %err, "model aborted");
                    report.models.push(ModelReport {
                        model: name.to_string(),
                        status: ModelStatus::Aborted,
                        requested: spec.count(),
                        generated: 0,
                        failed: 0,
                        duration_ms: 0,
                        reason: Some(err.to_string()),
                    });
                    for dependent in resolved.graph.dependents_of(name) {
                        blocked.entry(dependent).or_insert_with(|| name.to_string());
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            models = report.models.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GenerationResult {
            stores: ordered,
            report,
        })
    }

    /// Generate one model's batch. Errors abort the phase; `Ok(None)` means
    /// the phase was cancelled part way.
    fn run_phase(
        &self,
        pool: &ThreadPool,
        spec: &ModelSpec,
        stores: &HashMap<String, GeneratedStore>,
        report: &mut GenerationReport,
    ) -> Result<Option<GeneratedStore>, GenerationError> {
        let phase_start = Instant::now();
        let name = spec.name();
        let seed = model_seed(self.options.seed, name, spec.seed());
        let count = usize::try_from(spec.count()).map_err(|_| {
            GenerationError::InvalidModel(format!(
                "model '{name}': count {} exceeds platform limits",
                spec.count()
            ))
        })?;
        info!(model = %name, count, "generating model");

        let inputs = self.load_inputs(spec, seed)?;
        let attachments = self.plan_attachments(spec, stores, report)?;

        let outcomes: Vec<Option<Result<Value, SchemaGenerationError>>> = pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    Some(generate_document(spec, seed, index as u64, &inputs, &attachments))
                })
                .collect()
        });

        let mut builder = StoreBuilder::new(name, count);
        let mut failed = 0_u64;
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                Some(Ok(document)) => builder.push(document),
                Some(Err(err)) => {
                    debug!(model = %name, index = err.index, path = %err.path, error = %err.source, "document failed");
                    failed += 1;
                    report.record_failure(err.into());
                }
                None => cancelled = true,
            }
        }

        spec.schema().walk(&mut |_, node| {
            if let NodeKind::Base(capability) = node.kind() {
                report.record_generator_usage(capability.id());
            }
        });

        let generated = builder.len() as u64;
        let duration_ms = phase_start.elapsed().as_millis() as u64;
        report.models.push(ModelReport {
            model: name.to_string(),
            status: if cancelled {
                ModelStatus::Cancelled
            } else {
                ModelStatus::Completed
            },
            requested: spec.count(),
            generated,
            failed,
            duration_ms,
            reason: None,
        });
        if failed > 0 {
            warn!(model = %name, failed, "documents failed");
        }
        info!(model = %name, generated, failed, duration_ms, "model generated");

        Ok((!cancelled).then(|| builder.seal()))
    }

    fn load_inputs(&self, spec: &ModelSpec, seed: u64) -> Result<InputRows, GenerationError> {
        let mut inputs = InputRows::new();
        for binding in spec.inputs() {
            let alias = binding.alias();
            let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(seed, &format!("input:{alias}")));
            let rows = self
                .loader
                .load_sampled(&binding.source, binding.sample, &self.options.sampling, &mut rng)
                .map_err(|err| match err {
                    InputError::NotFound(_) => GenerationError::InputNotFound {
                        model: spec.name().to_string(),
                        input: binding.source.clone(),
                    },
                    other => GenerationError::Input(other),
                })?;
            debug!(model = %spec.name(), input = %alias, rows = rows.len(), "input loaded");
            inputs.insert(alias.to_string(), rows);
        }
        Ok(inputs)
    }

    fn plan_attachments<'s>(
        &self,
        spec: &'s ModelSpec,
        stores: &'s HashMap<String, GeneratedStore>,
        report: &mut GenerationReport,
    ) -> Result<Vec<AttachmentPlan<'s>>, GenerationError> {
        let mut plans = Vec::with_capacity(spec.dependencies().len());
        for (idx, binding) in spec.dependencies().iter().enumerate() {
            let store = stores.get(&binding.model).ok_or_else(|| {
                GenerationError::InvalidModel(format!(
                    "model '{}' depends on '{}', which has no generated documents",
                    spec.name(),
                    binding.model
                ))
            })?;
            let attachment = self
                .options
                .sampling
                .dependency_count(binding.sample, store.len());
            if attachment.is_degraded() {
                warn!(
                    model = %spec.name(),
                    dependency = %binding.model,
                    requested = attachment.requested,
                    available = store.len(),
                    "attachment degraded to available documents"
                );
                report.record_warning(
                    GenerationIssue::warning(
                        "attachment_degraded",
                        spec.name(),
                        format!(
                            "requested {} documents of '{}' per document, {} available",
                            attachment.requested,
                            binding.model,
                            store.len()
                        ),
                    )
                    .with_path(format!("/dependencies/{idx}")),
                );
            }
            plans.push(AttachmentPlan {
                model: &binding.model,
                documents: store.documents(),
                granted: attachment.granted,
            });
        }
        Ok(plans)
    }
}

struct AttachmentPlan<'s> {
    model: &'s str,
    documents: &'s [Value],
    granted: usize,
}

fn generate_document(
    spec: &ModelSpec,
    model_seed: u64,
    index: u64,
    inputs: &InputRows,
    attachments: &[AttachmentPlan<'_>],
) -> Result<Value, SchemaGenerationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(document_seed(model_seed, index));
    let mut attached: AttachedDocuments<'_> = BTreeMap::new();
    for plan in attachments {
        attached.insert(plan.model.to_string(), pick(plan.documents, plan.granted, &mut rng));
    }
    let mut ctx = GenerationContext::new(spec.name(), index, &mut rng)
        .with_key(spec.key())
        .with_inputs(inputs)
        .with_dependencies(&attached);
    spec.schema().generate(&mut ctx)
}
