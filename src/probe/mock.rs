//! Mock probe for tests and demos.
//!
//! A fully configurable probe with no real resource behind it: a scalar
//! `value` field, a nested `source` field resolved against its own type,
//! failure injection for the enable transition, and shared transition
//! counters so tests can assert exactly-once boundary crossings.
//!
//! # Enabling
//!
//! Only available when the `mock-probe` feature is enabled:
//!
//! ```bash
//! cargo test --features mock-probe
//! ```

use crate::config::{ConfigField, Configurable, FieldValue};
use crate::error::{ProbeFlowError, Result};
use crate::probe::{Probe, ProbeContext, SharedProbe};
use crate::registry::TypeRegistry;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Type name the mock registers under.
pub const MOCK_TYPE: &str = "mock.probe";

/// Shared transition counters for mock probes.
#[derive(Debug, Default)]
pub struct MockCounters {
    pub enables: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub disables: AtomicUsize,
}

impl MockCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

static SCHEMA: &[ConfigField] = &[
    ConfigField::scalar("value", || json!(2)),
    ConfigField::scalar("fail_enable", || json!(false)),
    ConfigField::probe("source", MOCK_TYPE, || Value::Null),
];

/// A probe that emits its configured value once per start.
pub struct MockProbe {
    value: i64,
    fail_enable: bool,
    source: Option<SharedProbe>,
    counters: Arc<MockCounters>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::with_counters(MockCounters::new())
    }

    /// A mock reporting transitions into shared counters.
    pub fn with_counters(counters: Arc<MockCounters>) -> Self {
        Self {
            value: 2,
            fail_enable: false,
            source: None,
            counters,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn source(&self) -> Option<&SharedProbe> {
        self.source.as_ref()
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurable for MockProbe {
    fn schema(&self) -> &'static [ConfigField] {
        SCHEMA
    }

    fn apply(&mut self, name: &str, value: FieldValue<'_>) -> Result<()> {
        match (name, value) {
            ("value", FieldValue::Scalar(v)) => {
                self.value = v.as_i64().ok_or_else(|| {
                    ProbeFlowError::MalformedConfig(format!("'value' must be an integer, got {v}"))
                })?;
                Ok(())
            }
            ("fail_enable", FieldValue::Scalar(v)) => {
                self.fail_enable = v.as_bool().ok_or_else(|| {
                    ProbeFlowError::MalformedConfig(format!(
                        "'fail_enable' must be a boolean, got {v}"
                    ))
                })?;
                Ok(())
            }
            ("source", FieldValue::Probe(shared)) => {
                self.source = Some(shared);
                Ok(())
            }
            _ => Err(ProbeFlowError::MalformedConfig(format!(
                "mock probe has no field '{name}'"
            ))),
        }
    }
}

impl Probe for MockProbe {
    fn type_name(&self) -> &'static str {
        MOCK_TYPE
    }

    fn checkpoint(&self) -> Option<Value> {
        Some(json!({ "value": self.value }))
    }

    fn on_enable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        if self.fail_enable {
            return Err(ProbeFlowError::Probe("mock enable failure".to_string()));
        }
        self.counters.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        ctx.emitter.emit(json!(self.value));
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_disable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters.disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Register the mock type (as its own base and default) on a registry,
/// reporting transitions into `counters`.
pub fn register(registry: &mut TypeRegistry, counters: Arc<MockCounters>) -> Result<()> {
    registry.register(MOCK_TYPE, MOCK_TYPE, move || {
        Box::new(MockProbe::with_counters(Arc::clone(&counters)))
    });
    registry.set_default(MOCK_TYPE, MOCK_TYPE)
}
