//! The session-scoped runtime: registry + cache + teardown.
//!
//! A [`ProbeRuntime`] owns everything a graph needs: the type registry
//! consulted by resolution and the instance cache enforcing shared
//! ownership. It is a plain value: inject it wherever resolution
//! happens; its lifetime scopes the graph. Dropping it (or calling
//! [`ProbeRuntime::shutdown`]) disables every live probe best-effort.
//!
//! # Example
//!
//! ```ignore
//! use probeflow::runtime::ProbeRuntime;
//!
//! let mut runtime = ProbeRuntime::new();
//! runtime.registry_mut().register("sensor.pulse", "sensor.pulse", || {
//!     Box::new(PulseProbe::new())
//! });
//!
//! let probe = runtime.resolve_str(r#"{"@type":"sensor.pulse","rate_hz":10}"#, "sensor.pulse")?;
//! probe.add_listener(listener)?;
//! ```

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::probe::SharedProbe;
use crate::registry::{ConfigResolver, InstanceCache, TypeRegistry};
use crate::types::ProbeState;
use serde_json::Value;

/// Owns a graph's type registry and instance cache.
#[derive(Default)]
pub struct ProbeRuntime {
    registry: TypeRegistry,
    cache: InstanceCache,
}

impl ProbeRuntime {
    /// An empty runtime; register types before resolving.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a runtime around a pre-populated registry.
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry,
            cache: InstanceCache::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Resolve a parsed configuration against a base type.
    pub fn resolve(&self, config: &ProbeConfig, base: &str) -> Result<SharedProbe> {
        ConfigResolver::new(&self.registry, &self.cache).resolve(config, base)
    }

    /// Resolve an already-parsed JSON value against a base type.
    pub fn resolve_value(&self, value: Value, base: &str) -> Result<SharedProbe> {
        self.resolve(&ProbeConfig::from_value(value)?, base)
    }

    /// Resolve a JSON document against a base type.
    pub fn resolve_str(&self, json: &str, base: &str) -> Result<SharedProbe> {
        self.resolve(&ProbeConfig::parse_str(json)?, base)
    }

    /// Number of live shared instances.
    pub fn live_count(&self) -> usize {
        self.cache.len()
    }

    /// Snapshot of every live shared instance.
    pub fn live_probes(&self) -> Vec<SharedProbe> {
        self.cache.live()
    }

    /// Disable every live probe (best-effort, teardown failures are
    /// logged by the handles) and drop the cache.
    pub fn shutdown(&self) {
        let live = self.cache.live();
        if !live.is_empty() {
            tracing::info!(probes = live.len(), "runtime shutting down");
        }
        for probe in live {
            if probe.state() != ProbeState::Disabled {
                probe.disable();
            }
        }
        self.cache.clear();
    }
}

impl Drop for ProbeRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigField, Configurable, FieldValue};
    use crate::probe::{Probe, ProbeContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TrackedProbe {
        disables: Arc<AtomicUsize>,
    }

    impl Configurable for TrackedProbe {
        fn schema(&self) -> &'static [ConfigField] {
            &[]
        }
        fn apply(&mut self, _name: &str, _value: FieldValue<'_>) -> Result<()> {
            Ok(())
        }
    }

    impl Probe for TrackedProbe {
        fn type_name(&self) -> &'static str {
            "test.tracked"
        }
        fn on_disable(&mut self, _ctx: &mut ProbeContext<'_>) -> Result<()> {
            self.disables.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_disables_live_probes() {
        let disables = Arc::new(AtomicUsize::new(0));
        let mut runtime = ProbeRuntime::new();
        let counter = Arc::clone(&disables);
        runtime
            .registry_mut()
            .register("test.tracked", "test.tracked", move || {
                Box::new(TrackedProbe {
                    disables: Arc::clone(&counter),
                })
            });

        let probe = runtime
            .resolve_str(r#"{"@type":"test.tracked"}"#, "test.tracked")
            .unwrap();
        probe.enable().unwrap();
        assert_eq!(runtime.live_count(), 1);

        runtime.shutdown();
        assert_eq!(disables.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.live_count(), 0);
    }

    #[test]
    fn test_resolution_requires_registration() {
        let runtime = ProbeRuntime::new();
        assert!(runtime
            .resolve_str(r#"{"@type":"test.unknown"}"#, "test.unknown")
            .is_err());
    }
}
