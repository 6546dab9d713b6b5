use std::fmt;

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Named child of an `object` node.
    Field(String),
    /// Element schema of an `array` node.
    Items,
}

/// Address of a schema node relative to the model root.
///
/// Rendered as `$` for the root, `$.address.city` for nested fields and
/// `$.phones[]` for array elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn push_field(&mut self, name: impl Into<String>) {
        self.segments.push(PathSegment::Field(name.into()));
    }

    pub fn push_items(&mut self) {
        self.segments.push(PathSegment::Items);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push_field(name);
        next
    }

    pub fn items(&self) -> Self {
        let mut next = self.clone();
        next.push_items();
        next
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Items => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_paths() {
        let path = NodePath::root().field("phones").items().field("number");
        assert_eq!(path.to_string(), "$.phones[].number");
        assert_eq!(NodePath::root().to_string(), "$");
    }
}
