//! Configuration handling for the probeflow runtime
//!
//! A probe configuration is a JSON object: an optional `"@type"`
//! discriminator naming the concrete runtime type, plus zero or more
//! configurable fields (scalars, nested configuration objects, or arrays
//! of either). Configurations are parsed once at graph-build time and
//! immutable afterwards.
//!
//! # Canonical form
//!
//! Two configurations are equivalent iff their canonical serialized forms
//! are equal. `serde_json` stores objects in a sorted map, so serializing
//! a parsed document already yields key-order-independent output; the
//! resolver additionally normalizes defaults-vs-explicit by building the
//! *effective* field map (schema defaults overlaid with explicit values)
//! before serializing. See [`crate::registry`].
//!
//! # Example
//!
//! ```ignore
//! use probeflow::config::{ProbeConfig, TYPE_KEY};
//!
//! let config = ProbeConfig::parse_str(r#"{"@type":"sensor.burst","rate_hz":10}"#)?;
//! assert_eq!(config.discriminator(), Some("sensor.burst"));
//! ```

pub mod schema;

pub use schema::{ConfigField, Configurable, FieldKind, FieldValue};

use crate::error::{ProbeFlowError, Result};
use serde_json::{Map, Value};

/// Key naming the concrete runtime type inside a configuration object
pub const TYPE_KEY: &str = "@type";

/// A parsed, immutable probe configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeConfig {
    fields: Map<String, Value>,
}

impl ProbeConfig {
    /// Build a configuration from an already-parsed JSON value
    ///
    /// The value must be an object; anything else is a malformed
    /// configuration.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ProbeFlowError::MalformedConfig(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a configuration from a JSON document
    pub fn parse_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ProbeFlowError::MalformedConfig(e.to_string()))?;
        Self::from_value(value)
    }

    /// The `"@type"` discriminator, if present and a string
    pub fn discriminator(&self) -> Option<&str> {
        self.fields.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Look up an explicit field value (never returns the discriminator)
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == TYPE_KEY {
            return None;
        }
        self.fields.get(name)
    }

    /// Whether the configuration carries no fields beyond the discriminator
    pub fn is_empty(&self) -> bool {
        self.fields.keys().all(|k| k == TYPE_KEY)
    }

    /// Iterate over explicit fields, discriminator excluded
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(k, _)| k.as_str() != TYPE_KEY)
    }

    /// Serialize the raw (non-effective) fields in canonical key order
    pub fn canonical_string(&self) -> String {
        // serde_json's map is sorted, so serialization is already canonical.
        Value::Object(self.fields.clone()).to_string()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
