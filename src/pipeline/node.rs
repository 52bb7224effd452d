//! PipelineNode: a probe that relays one upstream source.
//!
//! The node's `on_start` installs a forwarding listener on its single
//! upstream (install-once, guarded by the wired flag), which drives the
//! upstream's demand count; `on_stop` withdraws it. An optional
//! [`Filter`] sits between upstream output and this node's own fan-out.
//!
//! Nodes register in the type registry like any probe, with the
//! upstream as a nested probe field resolved against [`UPSTREAM_BASE`],
//! so transformation chains build from a single configuration document.

use crate::config::{ConfigField, Configurable, FieldValue};
use crate::error::{ProbeFlowError, Result};
use crate::pipeline::filter::Filter;
use crate::pipeline::DataSource;
use crate::probe::{DataListener, Emitter, Probe, ProbeContext};
use crate::types::ProbeOutput;
use serde_json::Value;
use std::sync::Arc;

/// Base type every config-driven upstream resolves against. Probe types
/// that should be wrappable from configuration register a variant under
/// this base (`TypeRegistry::add_variant`).
pub const UPSTREAM_BASE: &str = "probe";

/// Default type name for plain (unfiltered) nodes.
pub const PASSTHROUGH_TYPE: &str = "pipeline.passthrough";

static SCHEMA: &[ConfigField] = &[ConfigField::probe("upstream", UPSTREAM_BASE, || Value::Null)];

/// Relays upstream values into the wrapping handle's fan-out.
struct ForwardListener {
    emitter: Emitter,
    filter: Option<Arc<dyn Filter>>,
}

impl DataListener for ForwardListener {
    fn on_data(&self, output: &ProbeOutput) {
        match &self.filter {
            None => self.emitter.forward(output.clone()),
            Some(filter) => {
                if let Some(mapped) = filter.apply(output) {
                    self.emitter.forward(mapped);
                }
            }
        }
    }

    fn on_completed(&self, identity: &str, checkpoint: Option<&Value>) {
        // Upstream finished; let downstream consumers flush too.
        self.emitter.forward_completed(identity, checkpoint);
    }
}

/// A pipeline stage wrapping exactly one upstream source.
pub struct PipelineNode {
    name: &'static str,
    upstream: Option<Arc<dyn DataSource>>,
    filter: Option<Arc<dyn Filter>>,
    /// Forwarding listener, present once wired. Install-once: repeated
    /// starts reuse it, so the upstream never sees a double-register.
    forward: Option<Arc<ForwardListener>>,
}

impl PipelineNode {
    /// An unconfigured passthrough node; the upstream arrives through
    /// the `upstream` config field.
    pub fn new() -> Self {
        Self::named(PASSTHROUGH_TYPE)
    }

    /// A node registered under its own type name (filtering variants).
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            upstream: None,
            filter: None,
            forward: None,
        }
    }

    /// Programmatic construction around an existing source.
    pub fn with_upstream(upstream: Arc<dyn DataSource>) -> Self {
        let mut node = Self::new();
        node.upstream = Some(upstream);
        node
    }

    /// Attach a filter. Takes effect when the node is first wired, so
    /// set it before the first start.
    pub fn set_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filter = Some(filter);
    }

    /// Builder-style [`Self::set_filter`].
    pub fn filtered(mut self, filter: Arc<dyn Filter>) -> Self {
        self.set_filter(filter);
        self
    }

    /// Identity of the wrapped upstream, if one is attached.
    pub fn upstream_identity(&self) -> Option<String> {
        self.upstream.as_ref().map(|u| u.identity().to_string())
    }
}

impl Default for PipelineNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurable for PipelineNode {
    fn schema(&self) -> &'static [ConfigField] {
        SCHEMA
    }

    fn apply(&mut self, name: &str, value: FieldValue<'_>) -> Result<()> {
        match (name, value) {
            ("upstream", FieldValue::Probe(shared)) => {
                self.upstream = Some(shared);
                Ok(())
            }
            _ => Err(ProbeFlowError::MalformedConfig(format!(
                "pipeline node has no field '{name}'"
            ))),
        }
    }
}

impl Probe for PipelineNode {
    fn type_name(&self) -> &'static str {
        self.name
    }

    fn on_start(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        let upstream = self.upstream.as_ref().ok_or_else(|| {
            ProbeFlowError::Probe(format!("pipeline node '{}' has no upstream", self.name))
        })?;
        if self.forward.is_none() {
            self.forward = Some(Arc::new(ForwardListener {
                emitter: ctx.emitter.clone(),
                filter: self.filter.clone(),
            }));
        }
        if let Some(forward) = &self.forward {
            let listener: Arc<dyn DataListener> = Arc::clone(forward) as Arc<dyn DataListener>;
            upstream.add_listener(listener)?;
        }
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
        if let (Some(upstream), Some(forward)) = (&self.upstream, &self.forward) {
            let listener: Arc<dyn DataListener> = Arc::clone(forward) as Arc<dyn DataListener>;
            upstream.remove_listener(&listener);
        }
        Ok(())
    }
}
