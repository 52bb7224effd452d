//! Configuration-to-instance resolution.
//!
//! Resolution order for a configuration against a declared base type:
//!
//! 1. If the `"@type"` discriminator names a registered, instantiable
//!    variant of the base, use it.
//! 2. Else, if the base has a registered default that is assignable and
//!    instantiable, use it.
//! 3. Else fail with `UnresolvableType`. Never silently defaulted past
//!    this point.
//!
//! After the runtime type is chosen, the resolver builds the *effective*
//! configuration (every declared field at its explicit value or its
//! schema default, nested probe fields canonicalized recursively) and
//! uses its serialized form as the cache identity. Only on a cache miss
//! does it construct: fresh instance from the factory, then
//! default-then-override field application (explicit scalars applied,
//! nested probes resolved through this same resolver and attached).
//! Undeclared configuration keys never touch the instance.

use crate::config::{ConfigField, FieldKind, FieldValue, ProbeConfig, TYPE_KEY};
use crate::error::{ProbeFlowError, Result, ResultExt};
use crate::probe::{Probe, ProbeHandle, SharedProbe};
use crate::registry::{InstanceCache, ProbeDescriptor, TypeRegistry};
use serde_json::{Map, Value};

/// Resolves configurations to shared probe instances through a registry
/// and an instance cache. Borrow-scoped: build one per resolution batch.
pub struct ConfigResolver<'a> {
    registry: &'a TypeRegistry,
    cache: &'a InstanceCache,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(registry: &'a TypeRegistry, cache: &'a InstanceCache) -> Self {
        Self { registry, cache }
    }

    /// Resolve a configuration against a base type into the shared
    /// instance for its identity, constructing it on first need.
    pub fn resolve(&self, config: &ProbeConfig, base: &str) -> Result<SharedProbe> {
        let runtime_type = self.resolve_type(config, base)?;
        let canonical = self.canonical_config(&runtime_type, config)?.to_string();
        let descriptor = ProbeDescriptor {
            base: base.to_string(),
            runtime_type,
            canonical,
        };

        if let Some(existing) = self.cache.get(&descriptor) {
            tracing::debug!(probe = %descriptor.runtime_type, "instance cache hit");
            return Ok(existing);
        }

        let probe = self
            .construct(&descriptor.runtime_type, config)
            .with_context(|| format!("building '{}'", descriptor.runtime_type))?;
        let handle = ProbeHandle::new(descriptor.clone(), probe);
        // Another caller may have constructed concurrently; first insert
        // wins and the loser is dropped here, before any lifecycle use.
        Ok(self.cache.insert_or_get(&descriptor, handle))
    }

    /// Steps (1)-(3) of the resolution order.
    pub fn resolve_type(&self, config: &ProbeConfig, base: &str) -> Result<String> {
        if let Some(disc) = config.discriminator() {
            if self.registry.is_assignable(base, disc) && self.registry.is_instantiable(disc) {
                return Ok(disc.to_string());
            }
            tracing::debug!(
                discriminator = disc,
                base,
                "discriminator unusable, trying default"
            );
        }
        if let Some(default) = self.registry.default_for(base) {
            // set_default validated assignability and instantiability.
            return Ok(default.to_string());
        }
        let message = match config.discriminator() {
            Some(disc) => format!("'{disc}' is not an instantiable variant and no default is registered"),
            None => "no discriminator and no default registered".to_string(),
        };
        Err(ProbeFlowError::unresolvable(base, message))
    }

    /// The effective configuration: defaults overlaid with explicit
    /// values, nested fields canonicalized recursively, keys sorted.
    fn canonical_config(&self, runtime_type: &str, config: &ProbeConfig) -> Result<Value> {
        let schema = self.schema_of(runtime_type)?;
        let mut map = Map::new();
        map.insert(TYPE_KEY.to_string(), Value::String(runtime_type.to_string()));

        for field in schema {
            let effective = config
                .get(field.name)
                .cloned()
                .unwrap_or_else(|| (field.default)());
            match field.kind {
                FieldKind::Scalar => {
                    map.insert(field.name.to_string(), effective);
                }
                FieldKind::Probe { base } => {
                    if effective.is_null() {
                        continue;
                    }
                    let nested = ProbeConfig::from_value(effective)
                        .with_context(|| field_context(runtime_type, field))?;
                    let nested_type = self.resolve_type(&nested, base)?;
                    let canonical = self.canonical_config(&nested_type, &nested)?;
                    map.insert(field.name.to_string(), canonical);
                }
                FieldKind::ProbeList { base } => {
                    if effective.is_null() {
                        continue;
                    }
                    let items = as_array(&effective)
                        .with_context(|| field_context(runtime_type, field))?;
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        let nested = ProbeConfig::from_value(item.clone())
                            .with_context(|| field_context(runtime_type, field))?;
                        let nested_type = self.resolve_type(&nested, base)?;
                        out.push(self.canonical_config(&nested_type, &nested)?);
                    }
                    map.insert(field.name.to_string(), Value::Array(out));
                }
            }
        }
        Ok(Value::Object(map))
    }

    /// Fresh instance + default-then-override field application.
    fn construct(&self, runtime_type: &str, config: &ProbeConfig) -> Result<Box<dyn Probe>> {
        let mut probe = self.registry.construct(runtime_type)?;
        let schema = probe.schema();

        for field in schema {
            match field.kind {
                FieldKind::Scalar => {
                    // The fresh instance already carries its defaults;
                    // only explicit values are applied.
                    if let Some(value) = config.get(field.name) {
                        probe
                            .apply(field.name, FieldValue::Scalar(value))
                            .with_context(|| field_context(runtime_type, field))?;
                    }
                }
                FieldKind::Probe { base } => {
                    let effective = config
                        .get(field.name)
                        .cloned()
                        .unwrap_or_else(|| (field.default)());
                    if effective.is_null() {
                        continue;
                    }
                    let nested = ProbeConfig::from_value(effective)
                        .with_context(|| field_context(runtime_type, field))?;
                    let shared = self.resolve(&nested, base)?;
                    probe
                        .apply(field.name, FieldValue::Probe(shared))
                        .with_context(|| field_context(runtime_type, field))?;
                }
                FieldKind::ProbeList { base } => {
                    let effective = config
                        .get(field.name)
                        .cloned()
                        .unwrap_or_else(|| (field.default)());
                    if effective.is_null() {
                        continue;
                    }
                    let items = as_array(&effective)
                        .with_context(|| field_context(runtime_type, field))?;
                    let mut shared = Vec::with_capacity(items.len());
                    for item in items {
                        let nested = ProbeConfig::from_value(item.clone())
                            .with_context(|| field_context(runtime_type, field))?;
                        shared.push(self.resolve(&nested, base)?);
                    }
                    probe
                        .apply(field.name, FieldValue::ProbeList(shared))
                        .with_context(|| field_context(runtime_type, field))?;
                }
            }
        }
        Ok(probe)
    }

    fn schema_of(&self, runtime_type: &str) -> Result<&'static [ConfigField]> {
        self.registry.schema_of(runtime_type).ok_or_else(|| {
            ProbeFlowError::unresolvable(runtime_type, "no schema registered for this type")
        })
    }
}

fn field_context(runtime_type: &str, field: &ConfigField) -> String {
    format!("field '{}' of '{}'", field.name, runtime_type)
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ProbeFlowError::MalformedConfig("expected a JSON array".to_string()))
}
