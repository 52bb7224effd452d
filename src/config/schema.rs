//! Explicit per-type configuration schemas.
//!
//! Each configurable type supplies a static list of [`ConfigField`]s:
//! the field name, its default value, and whether the field holds a
//! scalar or a nested probe. The resolver reads the schema to apply
//! default-then-override semantics; fields not declared here are never
//! touched (opt-in allowlist). This replaces annotation-driven
//! reflection with a register-at-startup schema the type itself owns.

use crate::error::Result;
use crate::probe::SharedProbe;
use serde_json::Value;

/// What kind of value a configurable field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain JSON scalar, object, or array applied verbatim
    Scalar,
    /// A nested probe configuration, resolved against the named base type
    Probe { base: &'static str },
    /// An array of nested probe configurations, each resolved against the base
    ProbeList { base: &'static str },
}

/// One declared configurable field of a probe type
#[derive(Debug, Clone)]
pub struct ConfigField {
    /// Field name as it appears in the configuration document
    pub name: &'static str,
    /// Kind of value this field holds
    pub kind: FieldKind,
    /// Default used when the configuration omits the field.
    ///
    /// For `Probe` fields this is a nested configuration object (or
    /// `Value::Null` for "no nested probe by default").
    pub default: fn() -> Value,
}

impl ConfigField {
    /// Declare a scalar field
    pub const fn scalar(name: &'static str, default: fn() -> Value) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
            default,
        }
    }

    /// Declare a nested probe field resolved against `base`
    pub const fn probe(name: &'static str, base: &'static str, default: fn() -> Value) -> Self {
        Self {
            name,
            kind: FieldKind::Probe { base },
            default,
        }
    }

    /// Declare a list-of-probes field resolved against `base`
    pub const fn probe_list(
        name: &'static str,
        base: &'static str,
        default: fn() -> Value,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::ProbeList { base },
            default,
        }
    }
}

/// A field value as handed to [`Configurable::apply`] by the resolver.
///
/// Nested probe fields arrive already resolved and cached, so a type
/// never sees raw nested configuration.
pub enum FieldValue<'a> {
    /// A scalar (or verbatim object/array) value
    Scalar(&'a Value),
    /// A resolved nested probe
    Probe(SharedProbe),
    /// A resolved list of nested probes
    ProbeList(Vec<SharedProbe>),
}

/// Trait for types whose fields can be driven from configuration.
///
/// Implementations list their configurable fields in [`Self::schema`] and
/// accept resolved values through [`Self::apply`]. A fresh instance must
/// come up with every schema default already in effect; `apply` is only
/// called for fields the resolver decides to set (which, under
/// default-then-override, is every declared field).
pub trait Configurable {
    /// The declared configurable fields of this type
    fn schema(&self) -> &'static [ConfigField];

    /// Set one declared field to a resolved value
    fn apply(&mut self, name: &str, value: FieldValue<'_>) -> Result<()>;
}
