//! Catalogue of generators that can back a `base` schema node.
//!
//! A generator validates its params once, when a declaration is compiled,
//! and returns a [`Capability`] that produces values for every document.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use fakeit_core::{Capability, CapabilityError, GenerationContext, capability_fn};

use crate::errors::GenerationError;

mod faker;
mod primitives;
mod refs;

/// Factory for base node capabilities, addressed by id.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    /// Validate `params` and bind them into a capability.
    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError>;
}

/// Generators available to model declarations.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorRegistry {
    /// Registry holding the full built-in catalogue.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        refs::register(&mut registry);
        faker::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Add a generator, replacing any previous one with the same id.
    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn get(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    /// Sorted generator ids.
    pub fn ids(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    pub fn bind(
        &self,
        id: &str,
        params: Option<&Value>,
    ) -> Result<Arc<dyn Capability>, GenerationError> {
        let generator = self
            .get(id)
            .ok_or_else(|| GenerationError::InvalidModel(format!("unknown generator '{id}'")))?;
        generator.bind(params)
    }
}

pub(crate) fn bound<F>(id: &'static str, func: F) -> Arc<dyn Capability>
where
    F: Fn(&mut GenerationContext<'_>) -> Result<Value, CapabilityError> + Send + Sync + 'static,
{
    Arc::new(capability_fn(id, func))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    use super::*;

    #[test]
    fn catalogue_lists_every_family() {
        let registry = GeneratorRegistry::new();
        let ids = registry.ids();
        for id in [
            "primitive.int",
            "primitive.text.pattern",
            "ref.dependency",
            "ref.input",
            "faker.name.full_name",
            "faker.lorem.sentence",
        ] {
            assert!(ids.contains(&id), "missing {id}");
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn unknown_ids_and_bad_params_fail_at_bind() {
        let registry = GeneratorRegistry::new();
        let err = registry.bind("nope", None).expect_err("unknown");
        assert!(err.to_string().contains("unknown generator 'nope'"));
        assert!(
            registry
                .bind("primitive.int", Some(&json!({"min": 5, "max": 1})))
                .is_err()
        );
        assert!(
            registry
                .bind("primitive.int", Some(&json!({"minimum": 1})))
                .is_err()
        );
    }

    #[test]
    fn bound_capability_generates() {
        let registry = GeneratorRegistry::new();
        let capability = registry
            .bind("primitive.int", Some(&json!({"min": 3, "max": 3})))
            .expect("bind");
        assert_eq!(capability.id(), "primitive.int");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ctx = GenerationContext::new("m", 0, &mut rng);
        assert_eq!(capability.generate(&mut ctx).expect("value"), json!(3));
    }
}
