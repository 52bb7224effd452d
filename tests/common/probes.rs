//! Test probe types: a base sensor and a variant with a nested field.

use probeflow::{
    ConfigField, Configurable, FieldValue, PipelineNode, Probe, ProbeContext, ProbeFlowError,
    ProbeRuntime, Result, RetentionPolicy, SharedProbe,
};
use serde_json::{json, Value};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Base type test probes register under.
pub const PULSE: &str = "sensor.pulse";
/// Variant type registered under the pulse base.
pub const BURST: &str = "sensor.burst";
/// Plain wrapping stage.
pub const PASSTHROUGH: &str = "pipeline.passthrough";
/// Base every config-wrappable source registers a variant under.
pub const PROBE_BASE: &str = "probe";

/// Transition counters shared by every instance a factory creates.
#[derive(Debug, Default)]
pub struct TransitionCounters {
    pub enables: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub disables: AtomicUsize,
}

impl TransitionCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

static PULSE_SCHEMA: &[ConfigField] = &[ConfigField::scalar("rate_hz", || json!(2))];

/// Base sensor: one scalar field, emits its configuration on start.
pub struct PulseProbe {
    rate_hz: i64,
    retention: RetentionPolicy,
    counters: Arc<TransitionCounters>,
}

impl PulseProbe {
    pub fn new(counters: Arc<TransitionCounters>) -> Self {
        Self {
            rate_hz: 2,
            retention: RetentionPolicy::DisableImmediately,
            counters,
        }
    }

    pub fn retained(mut self) -> Self {
        self.retention = RetentionPolicy::RetainEnabled;
        self
    }
}

impl Configurable for PulseProbe {
    fn schema(&self) -> &'static [ConfigField] {
        PULSE_SCHEMA
    }

    fn apply(&mut self, name: &str, value: FieldValue<'_>) -> Result<()> {
        match (name, value) {
            ("rate_hz", FieldValue::Scalar(v)) => {
                self.rate_hz = v.as_i64().ok_or_else(|| {
                    ProbeFlowError::MalformedConfig("'rate_hz' must be an integer".to_string())
                })?;
                Ok(())
            }
            _ => Err(ProbeFlowError::MalformedConfig(format!(
                "pulse probe has no field '{name}'"
            ))),
        }
    }
}

impl Probe for PulseProbe {
    fn type_name(&self) -> &'static str {
        PULSE
    }

    fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    fn checkpoint(&self) -> Option<Value> {
        Some(json!({ "rate_hz": self.rate_hz }))
    }

    fn on_enable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters
            .enables
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters
            .starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        ctx.emitter.emit(json!({ "rate_hz": self.rate_hz }));
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters
            .stops
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn on_disable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        self.counters
            .disables
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

static BURST_SCHEMA: &[ConfigField] = &[
    ConfigField::scalar("rate_hz", || json!(2)),
    ConfigField::scalar("burst_len", || json!(5)),
    ConfigField::probe("trigger", PULSE, || Value::Null),
];

/// Variant sensor with an extra scalar and a nested trigger probe.
pub struct BurstProbe {
    rate_hz: i64,
    burst_len: i64,
    trigger: Option<SharedProbe>,
}

impl BurstProbe {
    pub fn new() -> Self {
        Self {
            rate_hz: 2,
            burst_len: 5,
            trigger: None,
        }
    }
}

impl Default for BurstProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurable for BurstProbe {
    fn schema(&self) -> &'static [ConfigField] {
        BURST_SCHEMA
    }

    fn apply(&mut self, name: &str, value: FieldValue<'_>) -> Result<()> {
        match (name, value) {
            ("rate_hz", FieldValue::Scalar(v)) => {
                self.rate_hz = v.as_i64().ok_or_else(|| {
                    ProbeFlowError::MalformedConfig("'rate_hz' must be an integer".to_string())
                })?;
                Ok(())
            }
            ("burst_len", FieldValue::Scalar(v)) => {
                self.burst_len = v.as_i64().ok_or_else(|| {
                    ProbeFlowError::MalformedConfig("'burst_len' must be an integer".to_string())
                })?;
                Ok(())
            }
            ("trigger", FieldValue::Probe(shared)) => {
                self.trigger = Some(shared);
                Ok(())
            }
            _ => Err(ProbeFlowError::MalformedConfig(format!(
                "burst probe has no field '{name}'"
            ))),
        }
    }
}

impl Probe for BurstProbe {
    fn type_name(&self) -> &'static str {
        BURST
    }

    fn on_start(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        ctx.emitter.emit(json!({
            "rate_hz": self.rate_hz,
            "burst_len": self.burst_len,
            "has_trigger": self.trigger.is_some(),
        }));
        Ok(())
    }
}

/// A runtime with the full test vocabulary registered: pulse (default
/// for its base), burst as a pulse variant, the passthrough stage, and
/// both sensors wrappable under the generic probe base.
pub fn test_runtime(counters: Arc<TransitionCounters>) -> ProbeRuntime {
    let mut runtime = ProbeRuntime::new();
    {
        let registry = runtime.registry_mut();
        let pulse_counters = Arc::clone(&counters);
        registry.register(PULSE, PULSE, move || {
            Box::new(PulseProbe::new(Arc::clone(&pulse_counters)))
        });
        registry.register(PULSE, BURST, || Box::new(BurstProbe::new()));
        registry.set_default(PULSE, PULSE).unwrap();

        registry.register(PROBE_BASE, PASSTHROUGH, || Box::new(PipelineNode::new()));
        registry.add_variant(PROBE_BASE, PULSE).unwrap();
        registry.add_variant(PROBE_BASE, BURST).unwrap();
    }
    runtime
}
