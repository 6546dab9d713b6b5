use fakeit_core::Repeat;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of one model file: a single model or a `models` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ModelFile {
    Many { models: Vec<ModelDecl> },
    One(ModelDecl),
}

impl ModelFile {
    pub fn into_models(self) -> Vec<ModelDecl> {
        match self {
            ModelFile::Many { models } => models,
            ModelFile::One(model) => vec![model],
        }
    }
}

/// Declarative description of one model as authored in YAML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelDecl {
    /// Unique model name.
    pub name: String,
    /// Number of documents to generate (defaults to 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountDecl>,
    /// Top-level field carrying the application-level identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Per-model seed, overriding the one derived from the run seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyBinding>,
    /// Root schema node; must be an object.
    pub schema: NodeDecl,
}

/// Document count, fixed or drawn from a range once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CountDecl {
    Fixed(u64),
    Range { min: u64, max: u64 },
}

/// Input data source bound to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputBinding {
    /// Source identifier understood by the input loader (e.g. `countries.csv`).
    pub source: String,
    /// Alias used by generators; defaults to `source`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Number of rows to keep; absent keeps every row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<f64>,
}

impl InputBinding {
    pub fn alias(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }
}

/// Dependency on another model's generated documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DependencyBinding {
    pub model: String,
    /// Documents attached per parent document; absent attaches the whole store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<f64>,
}

/// Schema node declaration, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDecl {
    Base(BaseDecl),
    Object(ObjectDecl),
    Array(ArrayDecl),
}

impl NodeDecl {
    pub fn variant(&self) -> &'static str {
        match self {
            NodeDecl::Base(_) => "base",
            NodeDecl::Object(_) => "object",
            NodeDecl::Array(_) => "array",
        }
    }

    /// Visit every base declaration with its JSON pointer relative to this node.
    pub fn visit_bases<F>(&self, pointer: &str, visit: &mut F)
    where
        F: FnMut(&str, &BaseDecl),
    {
        match self {
            NodeDecl::Base(base) => visit(pointer, base),
            NodeDecl::Object(object) => {
                for (name, child) in &object.properties {
                    let child_pointer = format!("{pointer}/properties/{}", escape_pointer(name));
                    child.visit_bases(&child_pointer, visit);
                }
            }
            NodeDecl::Array(array) => {
                array.items.visit_bases(&format!("{pointer}/items"), visit);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BaseDecl {
    /// Generator id from the catalogue (e.g. `primitive.int`).
    pub generator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectDecl {
    #[serde(default)]
    pub properties: IndexMap<String, NodeDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArrayDecl {
    pub items: Box<NodeDecl>,
    #[serde(default)]
    pub repeat: Repeat,
}

pub(crate) fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
