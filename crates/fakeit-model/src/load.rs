use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::{ModelError, Result};
use crate::validate::{ValidatedModels, validate_models};

const MODEL_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Raw model document together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSource {
    pub origin: String,
    pub value: Value,
}

/// Parse model file contents; the origin's extension selects JSON or YAML.
pub fn parse_model_source(origin: impl Into<String>, contents: &str) -> Result<ModelSource> {
    let origin = origin.into();
    let value = if origin.ends_with(".json") {
        serde_json::from_str(contents)?
    } else {
        serde_yaml::from_str(contents)?
    };
    Ok(ModelSource { origin, value })
}

/// Read a model file, or every model file of a directory in file name order.
pub fn load_model_sources(path: &Path) -> Result<Vec<ModelSource>> {
    if !path.is_dir() {
        return Ok(vec![read_source(path)?]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let file = entry?.path();
        let is_model = file
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MODEL_EXTENSIONS.contains(&ext));
        if file.is_file() && is_model {
            files.push(file);
        }
    }
    files.sort();

    files.iter().map(|file| read_source(file)).collect()
}

/// Load and validate every model declaration under `path`.
pub fn load_models(path: &Path) -> Result<ValidatedModels> {
    let sources = load_model_sources(path)?;
    debug!(path = %path.display(), files = sources.len(), "loaded model sources");
    validate_models(&sources).map_err(ModelError::Invalid)
}

fn read_source(path: &Path) -> Result<ModelSource> {
    let contents = fs::read_to_string(path)?;
    parse_model_source(path.display().to_string(), &contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_and_json() {
        let yaml = parse_model_source("a.yaml", "name: a\nschema: {type: object}\n").expect("yaml");
        assert_eq!(yaml.value["name"], "a");

        let json = parse_model_source("a.json", r#"{"name":"a"}"#).expect("json");
        assert_eq!(json.value["name"], "a");

        assert!(matches!(
            parse_model_source("a.json", "name: a"),
            Err(ModelError::Json(_))
        ));
    }
}
