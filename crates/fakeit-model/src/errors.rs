use serde::Serialize;
use thiserror::Error;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.code == code)
    }
}

/// Errors raised while declaring, registering or resolving models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate model '{0}'")]
    DuplicateModel(String),
    #[error("{}", unknown_model_message(name, referenced_by.as_deref()))]
    UnknownModel {
        name: String,
        referenced_by: Option<String>,
    },
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },
    #[error("invalid model '{model}': {message}")]
    InvalidModel { model: String, message: String },
    #[error("model validation failed with {} error(s)", .0.errors.len())]
    Invalid(ValidationReport),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("schema error: {0}")]
    Schema(String),
}

impl ModelError {
    pub(crate) fn invalid(model: &str, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            model: model.to_string(),
            message: message.into(),
        }
    }
}

impl From<fakeit_core::Error> for ModelError {
    fn from(err: fakeit_core::Error) -> Self {
        match err {
            fakeit_core::Error::DuplicateNode(name) => ModelError::DuplicateModel(name),
            fakeit_core::Error::UnknownNode { from, missing } => ModelError::UnknownModel {
                name: missing,
                referenced_by: Some(from),
            },
            fakeit_core::Error::Cycle { path } => ModelError::CyclicDependency { path },
            fakeit_core::Error::InvalidSchema(message) => ModelError::Schema(message),
        }
    }
}

fn unknown_model_message(name: &str, referenced_by: Option<&str>) -> String {
    match referenced_by {
        Some(parent) => format!("unknown model '{name}' (dependency of '{parent}')"),
        None => format!("unknown model '{name}'"),
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
