use thiserror::Error;

use fakeit_model::ModelError;

use crate::input::InputError;
use crate::model::GenerationReport;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("input '{input}' of model '{model}' not found")]
    InputNotFound { model: String, input: String },
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("generation failed: {}", .0.summary())]
    Failed(GenerationReport),
}
