use std::sync::Arc;

use serde_json::Value;

/// Append-only builder for one model's documents, in index order.
#[derive(Debug)]
pub struct StoreBuilder {
    model: String,
    documents: Vec<Value>,
}

impl StoreBuilder {
    pub fn new(model: impl Into<String>, capacity: usize) -> Self {
        Self {
            model: model.into(),
            documents: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, document: Value) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn seal(self) -> GeneratedStore {
        GeneratedStore {
            model: Arc::from(self.model),
            documents: Arc::from(self.documents),
        }
    }
}

/// Immutable documents generated for one model. Clones share storage.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStore {
    model: Arc<str>,
    documents: Arc<[Value]>,
}

impl GeneratedStore {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.documents.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.documents.get(index)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sealed_store_shares_documents() {
        let mut builder = StoreBuilder::new("users", 2);
        builder.push(json!({"id": 0}));
        builder.push(json!({"id": 1}));
        let store = builder.seal();
        let clone = store.clone();
        assert_eq!(store.model(), "users");
        assert_eq!(clone.len(), 2);
        assert!(std::ptr::eq(store.documents(), clone.documents()));
        assert_eq!(store.get(1), Some(&json!({"id": 1})));
    }
}
