//! # probeflow: config-driven probe graphs
//!
//! A runtime that turns a declarative JSON configuration into a live
//! graph of shared, lifecycle-managed data-producing probes feeding one
//! or more consumers, with minimal duplicated resource acquisition.
//!
//! ## Architecture
//!
//! - **Registry**: a discriminator string in the configuration resolves
//!   to a registered factory; instances are memoized by configuration
//!   identity, so two consumers requesting "the same" probe share one
//!   instance.
//! - **Probe**: every shared unit obeys a three-state lifecycle with
//!   idempotent, demand-counted start/stop: the underlying resource
//!   opens and closes exactly once per demand-nonzero period.
//! - **Pipeline**: wrapping/filtering stages built from the same
//!   start/stop primitive, composable from configuration.
//! - **Worker**: long-running units get a dedicated serialized execution
//!   context, created lazily and released explicitly.
//!
//! ## Data flow
//!
//! ```text
//! configuration ──► resolver ──► instance cache ──► shared probe
//!                                                      │ fan-out
//!                                   pipeline node ◄────┘
//!                                        │ filter
//!                                        ▼
//!                                    listeners (per-unit worker contexts)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use probeflow::prelude::*;
//!
//! let mut runtime = ProbeRuntime::new();
//! runtime.registry_mut().register("sensor.pulse", "sensor.pulse", || {
//!     Box::new(PulseProbe::new())
//! });
//! runtime.registry_mut().set_default("sensor.pulse", "sensor.pulse")?;
//!
//! let probe = runtime.resolve_str(r#"{"rate_hz": 10}"#, "sensor.pulse")?;
//! let listener = FnListener::new(|output| println!("{}", output.payload));
//! probe.add_listener(listener)?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod runtime;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use config::{ConfigField, Configurable, FieldKind, FieldValue, ProbeConfig, TYPE_KEY};
pub use error::{ProbeFlowError, Result};
pub use pipeline::{DataSource, Filter, FnFilter, PipelineNode};
pub use probe::{DataListener, Emitter, FnListener, Probe, ProbeContext, ProbeHandle, SharedProbe};
pub use registry::{InstanceCache, ProbeDescriptor, TypeRegistry};
pub use runtime::ProbeRuntime;
pub use types::{EmitStats, ProbeOutput, ProbeState, RetentionPolicy};
pub use worker::{Action, ActionRunner, WorkerContext};

/// Convenience glob import for consumers.
pub mod prelude {
    pub use crate::config::{ConfigField, Configurable, FieldKind, FieldValue, ProbeConfig};
    pub use crate::error::{ProbeFlowError, Result, ResultExt};
    pub use crate::pipeline::{DataSource, Filter, FnFilter, PipelineNode};
    pub use crate::probe::{
        DataListener, Emitter, FnListener, Probe, ProbeContext, ProbeHandle, SharedProbe,
    };
    pub use crate::registry::TypeRegistry;
    pub use crate::runtime::ProbeRuntime;
    pub use crate::types::{ProbeOutput, ProbeState, RetentionPolicy};
    pub use crate::worker::{Action, ActionRunner, WorkerContext};
}
