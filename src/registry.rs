//! Named transform lookup.
//!
//! Stages are resolved by name at chain construction time. Resolving the same
//! name twice yields two handles to one shared transform, and each handle backs
//! its own independent stage.

use crate::error::{PipelineError, Result};
use crate::transform::{Expander, Flipper, Identity, Logger, Rotator, Transform, Typewriter, Uppercaser};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of transforms keyed by name
#[derive(Default)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in transform
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Identity));
        registry.register(Arc::new(Logger));
        registry.register(Arc::new(Typewriter::new()));
        registry.register(Arc::new(Uppercaser));
        registry.register(Arc::new(Rotator));
        registry.register(Arc::new(Flipper));
        registry.register(Arc::new(Expander));
        registry
    }

    /// Register a transform under its own name, replacing any previous entry.
    ///
    /// Returns the replaced transform, if there was one.
    pub fn register(&mut self, transform: Arc<dyn Transform>) -> Option<Arc<dyn Transform>> {
        self.transforms.insert(transform.name().to_owned(), transform)
    }

    /// Look up a transform by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transform>> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTransform(name.to_owned()))
    }

    /// Names of all registered transforms, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MapTransform;

    #[test]
    fn test_builtins_registered() {
        let registry = TransformRegistry::with_builtins();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec!["expander", "flipper", "identity", "logger", "rotator", "typewriter", "uppercaser"]
        );
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::with_builtins();
        let err = registry.resolve("shouter").err().unwrap();
        assert!(matches!(err, PipelineError::UnknownTransform(name) if name == "shouter"));
    }

    #[test]
    fn test_resolve_twice_shares_transform() {
        let registry = TransformRegistry::with_builtins();
        let first = registry.resolve("rotator").unwrap();
        let second = registry.resolve("rotator").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TransformRegistry::with_builtins();
        let replaced = registry.register(Arc::new(MapTransform::new("uppercaser", |s| s.to_lowercase())));
        assert!(replaced.is_some());
        let transform = registry.resolve("uppercaser").unwrap();
        assert_eq!(
            transform.apply("ABC"),
            crate::transform::Transformed::Output("abc".into())
        );
    }
}
