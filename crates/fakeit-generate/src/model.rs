use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use fakeit_core::SchemaGenerationError;
use fakeit_model::SamplePolicy;

pub const DEFAULT_SEED: u64 = 42;

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Run seed; every document seed derives from it.
    pub seed: u64,
    /// Worker threads per phase. `None` uses the available parallelism.
    pub concurrency: Option<usize>,
    pub sampling: SamplePolicy,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            concurrency: None,
            sampling: SamplePolicy::default(),
        }
    }
}

impl GenerateOptions {
    pub fn threads(&self) -> usize {
        self.concurrency
            .filter(|threads| *threads > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1)
    }
}

/// Outcome of one model phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Completed,
    /// The phase failed fatally before generating documents.
    Aborted,
    /// A dependency was aborted, so the phase never ran.
    Skipped,
    Cancelled,
}

/// Summary of a generated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: String,
    pub status: ModelStatus,
    pub requested: u64,
    pub generated: u64,
    pub failed: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A document that could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub model: String,
    pub index: u64,
    pub path: String,
    pub message: String,
}

impl From<SchemaGenerationError> for DocumentFailure {
    fn from(err: SchemaGenerationError) -> Self {
        Self {
            model: err.model,
            index: err.index,
            path: err.path.to_string(),
            message: err.source.to_string(),
        }
    }
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: impl Into<String>, model: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.into(),
            message: message.into(),
            model: Some(model.to_string()),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub threads: usize,
    pub models: Vec<ModelReport>,
    pub failures: Vec<DocumentFailure>,
    pub warnings: Vec<GenerationIssue>,
    pub warnings_by_code: BTreeMap<String, u64>,
    /// Base nodes bound to each generator across the models that ran.
    pub generator_usage: BTreeMap<String, u64>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, threads: usize) -> Self {
        Self {
            run_id,
            seed,
            threads,
            models: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
            warnings_by_code: BTreeMap::new(),
            generator_usage: BTreeMap::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn record_failure(&mut self, failure: DocumentFailure) {
        self.failures.push(failure);
    }

    pub fn model(&self, name: &str) -> Option<&ModelReport> {
        self.models.iter().find(|model| model.model == name)
    }

    /// Models that were aborted or skipped.
    pub fn aborted_models(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|model| matches!(model.status, ModelStatus::Aborted | ModelStatus::Skipped))
            .map(|model| model.model.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.aborted_models().is_empty()
    }

    /// One-line summary such as `3 document failures across 2 models`.
    pub fn summary(&self) -> String {
        let failed_models: BTreeSet<&str> = self
            .failures
            .iter()
            .map(|failure| failure.model.as_str())
            .collect();
        let mut summary = format!(
            "{} document failures across {} models",
            self.failures.len(),
            failed_models.len()
        );
        let aborted = self.aborted_models();
        if !aborted.is_empty() {
            summary.push_str(&format!("; aborted: {}", aborted.join(", ")));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(model: &str, index: u64) -> DocumentFailure {
        DocumentFailure {
            model: model.to_string(),
            index,
            path: "$.x".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn summary_counts_failures_and_models() {
        let mut report = GenerationReport::new("run".to_string(), 1, 1);
        assert!(report.is_success());
        report.record_failure(failure("a", 1));
        report.record_failure(failure("a", 3));
        report.record_failure(failure("b", 0));
        assert!(!report.is_success());
        assert_eq!(report.summary(), "3 document failures across 2 models");
    }

    #[test]
    fn warnings_are_counted_by_code() {
        let mut report = GenerationReport::new("run".to_string(), 1, 1);
        report.record_warning(GenerationIssue::warning("attachment_degraded", "a", "x"));
        report.record_warning(GenerationIssue::warning("attachment_degraded", "b", "y"));
        assert_eq!(report.warnings_by_code.get("attachment_degraded"), Some(&2));
    }

    #[test]
    fn zero_concurrency_falls_back_to_parallelism() {
        let options = GenerateOptions {
            concurrency: Some(0),
            ..GenerateOptions::default()
        };
        assert!(options.threads() >= 1);
        let options = GenerateOptions {
            concurrency: Some(3),
            ..GenerateOptions::default()
        };
        assert_eq!(options.threads(), 3);
    }
}
