use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::ModelFile;

/// Emit the JSON Schema for model files.
pub fn model_json_schema() -> RootSchema {
    schema_for!(ModelFile)
}
