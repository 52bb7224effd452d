//! Type registration and polymorphic instantiation.
//!
//! The registry is the register-at-startup replacement for reflective
//! class lookup: a map from discriminator string to a factory function,
//! grouped under declared base types. A configuration's `"@type"` field
//! resolves against a base through [`resolver::ConfigResolver`], and the
//! resulting instances are memoized by [`cache::InstanceCache`] so that
//! two consumers requesting the same configuration share one instance.
//!
//! Registries are plain values owned by a [`crate::runtime::ProbeRuntime`]
//! rather than process-wide state.

pub mod cache;
pub mod resolver;

pub use cache::InstanceCache;
pub use resolver::ConfigResolver;

use crate::config::ConfigField;
use crate::error::{ProbeFlowError, Result};
use crate::probe::Probe;
use std::collections::{HashMap, HashSet};

/// Zero-argument constructor for a registered probe type.
///
/// Factories must be cheap and side-effect free: resource acquisition
/// belongs in `on_enable`, not construction. The registry invokes the
/// factory once at registration time to snapshot the type's schema.
pub type ProbeFactory = Box<dyn Fn() -> Box<dyn Probe> + Send + Sync>;

/// Identity of a resolved component: the cache key is
/// (runtime type, canonical configuration).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeDescriptor {
    /// Base type the configuration was resolved against
    pub base: String,
    /// Concrete runtime type chosen by resolution
    pub runtime_type: String,
    /// Canonical (effective, key-sorted) configuration
    pub canonical: String,
}

impl ProbeDescriptor {
    /// Descriptor for a programmatically built, uncached instance.
    pub fn direct(type_name: &str) -> Self {
        Self {
            base: type_name.to_string(),
            runtime_type: type_name.to_string(),
            canonical: "{}".to_string(),
        }
    }

    /// The instance-cache key.
    pub fn cache_key(&self) -> (String, String) {
        (self.runtime_type.clone(), self.canonical.clone())
    }
}

struct TypeEntry {
    factory: ProbeFactory,
    schema: &'static [ConfigField],
}

#[derive(Default)]
struct BaseEntry {
    default: Option<String>,
    variants: HashSet<String>,
}

/// Maps discriminator strings to factories, grouped under base types.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeEntry>,
    bases: HashMap<String, BaseEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a base type with no constructor of its own (abstract).
    /// Resolving against it requires a discriminator or a default.
    pub fn register_base(&mut self, base: &str) {
        self.bases.entry(base.to_string()).or_default();
    }

    /// Register an instantiable type under a base. `name` may equal
    /// `base` for standalone types. Calling again with the same name
    /// replaces the factory and adds assignability to the new base.
    pub fn register<F>(&mut self, base: &str, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Probe> + Send + Sync + 'static,
    {
        // Snapshot the schema once; factories are cheap by contract.
        let schema = factory().schema();
        self.types.insert(
            name.to_string(),
            TypeEntry {
                factory: Box::new(factory),
                schema,
            },
        );
        self.bases
            .entry(base.to_string())
            .or_default()
            .variants
            .insert(name.to_string());
    }

    /// Make an already-registered type assignable to another base.
    pub fn add_variant(&mut self, base: &str, name: &str) -> Result<()> {
        if !self.is_instantiable(name) {
            return Err(ProbeFlowError::unresolvable(
                base,
                format!("cannot add unregistered type '{name}' as a variant"),
            ));
        }
        self.bases
            .entry(base.to_string())
            .or_default()
            .variants
            .insert(name.to_string());
        Ok(())
    }

    /// Set the fallback type used when a configuration has no usable
    /// discriminator. The default must be assignable and instantiable.
    pub fn set_default(&mut self, base: &str, name: &str) -> Result<()> {
        if !self.is_assignable(base, name) {
            return Err(ProbeFlowError::unresolvable(
                base,
                format!("default '{name}' is not assignable to this base"),
            ));
        }
        if !self.is_instantiable(name) {
            return Err(ProbeFlowError::unresolvable(
                base,
                format!("default '{name}' is not instantiable"),
            ));
        }
        self.bases
            .entry(base.to_string())
            .or_default()
            .default = Some(name.to_string());
        Ok(())
    }

    /// Whether `name` may stand in where `base` is declared.
    pub fn is_assignable(&self, base: &str, name: &str) -> bool {
        name == base
            || self
                .bases
                .get(base)
                .is_some_and(|entry| entry.variants.contains(name))
    }

    /// Whether `name` has a registered factory.
    pub fn is_instantiable(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// The registered default for a base, if any.
    pub fn default_for(&self, base: &str) -> Option<&str> {
        self.bases
            .get(base)
            .and_then(|entry| entry.default.as_deref())
    }

    /// The declared schema of a registered type.
    pub fn schema_of(&self, name: &str) -> Option<&'static [ConfigField]> {
        self.types.get(name).map(|entry| entry.schema)
    }

    /// Construct a fresh, unconfigured instance of a registered type.
    pub fn construct(&self, name: &str) -> Result<Box<dyn Probe>> {
        let entry = self.types.get(name).ok_or_else(|| {
            ProbeFlowError::unresolvable(name, "no factory registered for this type")
        })?;
        Ok((entry.factory)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Configurable, FieldValue};
    use crate::probe::ProbeContext;

    struct NullProbe;

    impl Configurable for NullProbe {
        fn schema(&self) -> &'static [ConfigField] {
            &[]
        }
        fn apply(&mut self, _name: &str, _value: FieldValue<'_>) -> Result<()> {
            Ok(())
        }
    }

    impl Probe for NullProbe {
        fn type_name(&self) -> &'static str {
            "test.null"
        }
        fn on_enable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_construct() {
        let mut registry = TypeRegistry::new();
        registry.register("test.base", "test.null", || Box::new(NullProbe));

        assert!(registry.is_instantiable("test.null"));
        assert!(registry.is_assignable("test.base", "test.null"));
        assert!(registry.construct("test.null").is_ok());
    }

    #[test]
    fn test_abstract_base_is_not_instantiable() {
        let mut registry = TypeRegistry::new();
        registry.register_base("test.abstract");

        assert!(!registry.is_instantiable("test.abstract"));
        assert!(registry.construct("test.abstract").is_err());
    }

    #[test]
    fn test_default_must_be_assignable_and_instantiable() {
        let mut registry = TypeRegistry::new();
        registry.register("test.base", "test.null", || Box::new(NullProbe));

        assert!(registry.set_default("test.base", "test.null").is_ok());
        assert_eq!(registry.default_for("test.base"), Some("test.null"));

        assert!(registry.set_default("test.base", "test.unknown").is_err());
        assert!(registry.set_default("other.base", "test.null").is_err());
    }

    #[test]
    fn test_add_variant_to_second_base() {
        let mut registry = TypeRegistry::new();
        registry.register("test.base", "test.null", || Box::new(NullProbe));
        registry.add_variant("probe", "test.null").unwrap();

        assert!(registry.is_assignable("probe", "test.null"));
        assert!(registry.add_variant("probe", "test.unknown").is_err());
    }

    #[test]
    fn test_self_assignability() {
        let registry = TypeRegistry::new();
        assert!(registry.is_assignable("test.x", "test.x"));
    }
}
