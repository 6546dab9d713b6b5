use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::GenerationContext;
use crate::error::{CapabilityError, Error, Result, SchemaGenerationError};
use crate::path::NodePath;

/// Value producer bound to a `base` node.
pub trait Capability: Send + Sync + fmt::Debug {
    /// Identifier used in reports (generator id for catalogue generators).
    fn id(&self) -> &str;

    fn generate(&self, ctx: &mut GenerationContext<'_>) -> std::result::Result<Value, CapabilityError>;
}

/// Capability backed by a closure.
pub struct FnCapability<F> {
    id: String,
    func: F,
}

impl<F> fmt::Debug for FnCapability<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCapability").field("id", &self.id).finish()
    }
}

impl<F> Capability for FnCapability<F>
where
    F: Fn(&mut GenerationContext<'_>) -> std::result::Result<Value, CapabilityError> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self, ctx: &mut GenerationContext<'_>) -> std::result::Result<Value, CapabilityError> {
        (self.func)(ctx)
    }
}

/// Wrap a closure as a named capability.
pub fn capability_fn<F>(id: impl Into<String>, func: F) -> FnCapability<F>
where
    F: Fn(&mut GenerationContext<'_>) -> std::result::Result<Value, CapabilityError> + Send + Sync,
{
    FnCapability {
        id: id.into(),
        func,
    }
}

/// How many elements an `array` node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Repeat {
    /// Always exactly this many elements.
    Fixed(usize),
    /// Uniform draw in `[min, max]` for every generated array.
    Range { min: usize, max: usize },
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Fixed(1)
    }
}

impl Repeat {
    pub fn range(min: usize, max: usize) -> Result<Self> {
        let repeat = Repeat::Range { min, max };
        repeat.validate()?;
        Ok(repeat)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Repeat::Range { min, max } if min > max => Err(Error::InvalidSchema(format!(
                "repeat min ({min}) must be <= max ({max})"
            ))),
            _ => Ok(()),
        }
    }

    pub fn resolve(&self, rng: &mut dyn RngCore) -> usize {
        match *self {
            Repeat::Fixed(count) => count,
            Repeat::Range { min, max } if min >= max => min,
            Repeat::Range { min, max } => rng.random_range(min..=max),
        }
    }
}

/// Variant-specific payload of a schema node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Base(Arc<dyn Capability>),
    Object(Vec<(String, SchemaNode)>),
    Array {
        items: Box<SchemaNode>,
        repeat: Repeat,
    },
}

/// One node of the typed tree describing a generated document.
///
/// Nodes are built bottom-up. Only [`SchemaNode::into_root`] marks a node as
/// the root of a model, and a root node is refused as the child of another
/// node, so a tree always has exactly one root.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    kind: NodeKind,
    root: bool,
}

impl SchemaNode {
    pub fn base(capability: impl Capability + 'static) -> Self {
        Self::base_shared(Arc::new(capability))
    }

    pub fn base_shared(capability: Arc<dyn Capability>) -> Self {
        Self {
            kind: NodeKind::Base(capability),
            root: false,
        }
    }

    /// Build an object node. Field order is kept as given and becomes the
    /// field order of generated documents.
    pub fn object<I, K>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for (name, child) in fields {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(Error::InvalidSchema(format!("duplicate field '{name}'")));
            }
            ensure_not_root(&child, &name)?;
            ordered.push((name, child));
        }
        Ok(Self {
            kind: NodeKind::Object(ordered),
            root: false,
        })
    }

    pub fn array(items: SchemaNode, repeat: Repeat) -> Result<Self> {
        repeat.validate()?;
        ensure_not_root(&items, "[]")?;
        Ok(Self {
            kind: NodeKind::Array {
                items: Box::new(items),
                repeat,
            },
            root: false,
        })
    }

    /// Mark this node as a model root. Only object nodes qualify.
    pub fn into_root(mut self) -> Result<Self> {
        if !matches!(self.kind, NodeKind::Object(_)) {
            return Err(Error::InvalidSchema(format!(
                "model root must be an object node, found {}",
                self.variant()
            )));
        }
        self.root = true;
        Ok(self)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn variant(&self) -> &'static str {
        match self.kind {
            NodeKind::Base(_) => "base",
            NodeKind::Object(_) => "object",
            NodeKind::Array { .. } => "array",
        }
    }

    /// Direct child of an object node.
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::Object(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, child)| child),
            _ => None,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Object(fields) => fields.iter().map(|(name, _)| name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Visit every node depth-first together with its path from this node.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&NodePath, &SchemaNode),
    {
        let mut path = NodePath::root();
        self.walk_at(&mut path, visit);
    }

    fn walk_at<F>(&self, path: &mut NodePath, visit: &mut F)
    where
        F: FnMut(&NodePath, &SchemaNode),
    {
        visit(path, self);
        match &self.kind {
            NodeKind::Base(_) => {}
            NodeKind::Object(fields) => {
                for (name, child) in fields {
                    path.push_field(name.as_str());
                    child.walk_at(path, visit);
                    path.pop();
                }
            }
            NodeKind::Array { items, .. } => {
                path.push_items();
                items.walk_at(path, visit);
                path.pop();
            }
        }
    }

    pub fn generate(
        &self,
        ctx: &mut GenerationContext<'_>,
    ) -> std::result::Result<Value, SchemaGenerationError> {
        match &self.kind {
            NodeKind::Base(capability) => capability.generate(ctx).map_err(|err| ctx.error(err)),
            NodeKind::Object(fields) => {
                ctx.enter_scope();
                let mut outcome = Ok(());
                for (name, child) in fields {
                    ctx.path_mut().push_field(name.as_str());
                    let value = child.generate(ctx);
                    ctx.path_mut().pop();
                    match value {
                        Ok(value) => ctx.insert_field(name, value),
                        Err(err) => {
                            outcome = Err(err);
                            break;
                        }
                    }
                }
                let fields = ctx.exit_scope();
                outcome.map(|()| Value::Object(fields))
            }
            NodeKind::Array { items, repeat } => {
                let len = repeat.resolve(ctx.rng());
                ctx.path_mut().push_items();
                let values = (0..len)
                    .map(|_| items.generate(ctx))
                    .collect::<std::result::Result<Vec<_>, _>>();
                ctx.path_mut().pop();
                values.map(Value::Array)
            }
        }
    }
}

fn ensure_not_root(child: &SchemaNode, name: &str) -> Result<()> {
    if child.root {
        return Err(Error::InvalidSchema(format!(
            "root node cannot be nested under '{name}'"
        )));
    }
    Ok(())
}
